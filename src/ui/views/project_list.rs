use crate::api::{ClientError, Project};
use crate::cache::Snapshot;
use crate::client::TaskboardClient;
use crate::mutation::{Mutation, MutationOutcome};
use crate::pending::Pending;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{AuthView, ProjectDetailView};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// All projects, as seen by the signed-in user
pub struct ProjectListView {
  client: TaskboardClient,
  projects: Snapshot,
  list_state: ListState,
  form: Form,
  pending: Pending<Result<MutationOutcome, ClientError>>,
  message: Option<String>,
}

impl ProjectListView {
  pub fn new(client: TaskboardClient) -> Self {
    let projects = client.read_projects();
    Self {
      client,
      projects,
      list_state: ListState::default(),
      form: Form::new("New project").field("Title").field("Description"),
      pending: Pending::idle(),
      message: None,
    }
  }

  fn selected_project(&self) -> Option<&Project> {
    self.list_state.selected().and_then(|idx| self.projects.projects().get(idx))
  }

  fn create(&mut self, values: Vec<String>) {
    if self.pending.is_running() {
      return;
    }
    let [title, description] = match <[String; 2]>::try_from(values) {
      Ok(fields) => fields,
      Err(_) => return,
    };
    let client = self.client.clone();
    self
      .pending
      .spawn(async move { client.mutate(Mutation::CreateProject { title, description }).await });
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.projects.projects().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if self.projects.is_loading() {
      " Projects (loading...) ".to_string()
    } else if let Some(err) = &self.projects.last_error {
      format!(" Projects (error: {}) ", err.user_message())
    } else if let Some(fetched_at) = self.projects.fetched_at {
      let at = fetched_at.with_timezone(&Local).format("%H:%M:%S");
      format!(" Projects ({}) updated {} ", len, at)
    } else {
      format!(" Projects ({}) ", len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.projects.is_loading() {
      let content = if self.projects.last_error.is_some() {
        "Failed to load projects. Press 'r' to retry."
      } else {
        "No projects yet. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let viewer = self.client.session().current_user();
    let items: Vec<ListItem> = self
      .projects
      .projects()
      .iter()
      .map(|project| {
        let owned = viewer.as_ref().is_some_and(|u| project.is_owned_by(u));
        let owner_style = if owned {
          Style::default().fg(Color::Yellow)
        } else {
          Style::default().fg(Color::DarkGray)
        };
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<30}", truncate(&project.title, 30)), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::styled(format!("{:<16}", truncate(&project.owner.name, 16)), owner_style),
          Span::raw(" "),
          Span::raw(truncate(&project.description, 60)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for ProjectListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.create(values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled if self.form.is_active() => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('n') => {
        self.message = None;
        self.form.show();
      }
      KeyCode::Char('r') => {
        if let Some(key) = self.client.projects_key() {
          self.client.refetch(key);
        }
      }
      KeyCode::Enter => {
        if let Some(project) = self.selected_project() {
          let view = ProjectDetailView::new(self.client.clone(), project.clone());
          return ViewAction::Push(Box::new(view));
        }
      }
      KeyCode::Char('L') => {
        self.client.sign_out();
        return ViewAction::Replace(Box::new(AuthView::new(self.client.clone())));
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.projects = self.client.read_projects();

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(1)])
      .split(area);
    self.render_list(frame, chunks[0]);
    if let Some(message) = &self.message {
      frame.render_widget(
        Paragraph::new(message.as_str()).style(Style::default().fg(Color::Green)),
        chunks[1],
      );
    }

    self.form.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Projects".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.projects = self.client.read_projects();
    match self.pending.poll() {
      Some(Ok(MutationOutcome::ProjectCreated(project))) => {
        self.form.hide();
        self.message = Some(format!("Created project {}", project.title));
      }
      Some(Ok(_)) => self.form.hide(),
      Some(Err(err)) => self.form.set_error(Some(err.user_message())),
      None => {}
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Enter", "open").with_priority(10),
      ShortcutInfo::new("n", "new").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("L", "sign out").with_priority(80),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
