use crate::api::schema::is_valid_email;
use crate::api::ClientError;
use crate::client::TaskboardClient;
use crate::mutation::{AuthMode, Credentials, Mutation, MutationOutcome};
use crate::pending::Pending;
use crate::ui::centered_rect;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProjectListView;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Sign-in / sign-up screen, the root view while no one is signed in
pub struct AuthView {
  client: TaskboardClient,
  mode: AuthMode,
  form: Form,
  pending: Pending<Result<MutationOutcome, ClientError>>,
}

fn title(mode: AuthMode) -> &'static str {
  match mode {
    AuthMode::SignIn => "Sign in",
    AuthMode::SignUp => "Sign up",
  }
}

impl AuthView {
  pub fn new(client: TaskboardClient) -> Self {
    let mode = AuthMode::SignIn;
    let mut form = Form::new(title(mode)).field("Name").field("Email");
    form.show();
    Self {
      client,
      mode,
      form,
      pending: Pending::idle(),
    }
  }

  fn toggle_mode(&mut self) {
    self.mode = match self.mode {
      AuthMode::SignIn => AuthMode::SignUp,
      AuthMode::SignUp => AuthMode::SignIn,
    };
    self.form.set_title(title(self.mode));
    self.form.set_error(None);
  }

  fn submit(&mut self, values: Vec<String>) {
    let [name, email] = match <[String; 2]>::try_from(values) {
      Ok(fields) => fields,
      Err(_) => return,
    };
    if !is_valid_email(&email) {
      self.form.set_error(Some("Enter a valid email address".to_string()));
      return;
    }

    let client = self.client.clone();
    let mutation = Mutation::AuthenticateOrRegister {
      mode: self.mode,
      credentials: Credentials { name, email },
    };
    self.pending.spawn(async move { client.mutate(mutation).await });
  }
}

impl View for AuthView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.pending.is_running() {
      return ViewAction::None;
    }

    if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.toggle_mode();
      return ViewAction::None;
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => self.submit(values),
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Quit,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let form_area = centered_rect(area, 60, 6);
    self.form.render(frame, form_area);

    let hint = if self.pending.is_running() {
      Line::styled(format!("{}...", title(self.mode)), Style::default().fg(Color::Yellow))
    } else {
      let other = match self.mode {
        AuthMode::SignIn => "sign up",
        AuthMode::SignUp => "sign in",
      };
      Line::styled(
        format!("Ctrl-T: {} instead", other),
        Style::default().fg(Color::DarkGray),
      )
    };
    let hint_area = Rect::new(
      form_area.x,
      (form_area.y + form_area.height).min(area.bottom().saturating_sub(1)),
      form_area.width,
      1,
    );
    frame.render_widget(Paragraph::new(hint).alignment(Alignment::Center), hint_area);
  }

  fn breadcrumb_label(&self) -> String {
    title(self.mode).to_string()
  }

  fn tick(&mut self) -> ViewAction {
    match self.pending.poll() {
      Some(Ok(_)) => ViewAction::Replace(Box::new(ProjectListView::new(self.client.clone()))),
      Some(Err(err)) => {
        self.form.set_error(Some(err.user_message()));
        ViewAction::None
      }
      None => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Ctrl-T", "sign in/up").with_priority(10),
      ShortcutInfo::new("Esc", "quit").with_priority(90),
    ]
  }
}
