mod auth;
mod project_detail;
mod project_list;

pub use auth::AuthView;
pub use project_detail::ProjectDetailView;
pub use project_list::ProjectListView;
