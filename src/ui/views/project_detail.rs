use crate::api::{ClientError, Project, Task, TaskStatus};
use crate::cache::{CacheKey, Snapshot};
use crate::client::TaskboardClient;
use crate::mutation::{AssigneeSelection, Mutation, MutationOutcome, TaskChange};
use crate::pending::Pending;
use crate::ui::components::{Form, FormEvent, KeyResult, Picker, PickerEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// One project with its tasks. While this view is on the stack the project
/// is the session's open project.
pub struct ProjectDetailView {
  client: TaskboardClient,
  project: Project,
  tasks: Snapshot,
  users: Snapshot,
  list_state: ListState,
  form: Form,
  status_picker: Picker<TaskStatus>,
  assignee_picker: Picker<AssigneeSelection>,
  pending: Pending<Result<MutationOutcome, ClientError>>,
  message: Option<String>,
}

impl ProjectDetailView {
  pub fn new(client: TaskboardClient, project: Project) -> Self {
    client.session().open_project(project.id);
    let tasks = client.read_tasks(project.id);
    let users = client.read_users();
    Self {
      client,
      project,
      tasks,
      users,
      list_state: ListState::default(),
      form: Form::new("New task").field("Title").optional_field("Description"),
      status_picker: Picker::new(),
      assignee_picker: Picker::new(),
      pending: Pending::idle(),
      message: None,
    }
  }

  fn refresh(&mut self) {
    self.tasks = self.client.read_tasks(self.project.id);
    self.users = self.client.read_users();
  }

  fn is_owner(&self) -> bool {
    self
      .client
      .session()
      .current_user()
      .is_some_and(|user| self.project.is_owned_by(&user))
  }

  /// Newest first
  fn sorted_tasks(&self) -> Vec<Task> {
    let mut tasks = self.tasks.tasks().to_vec();
    tasks.sort_by(|a, b| b.id.cmp(&a.id));
    tasks
  }

  fn selected_task(&self) -> Option<Task> {
    let idx = self.list_state.selected()?;
    self.sorted_tasks().into_iter().nth(idx)
  }

  fn dispatch(&mut self, mutation: Mutation) {
    if self.pending.is_running() {
      self.message = Some("Still working on the previous change".to_string());
      return;
    }
    self.message = None;
    let client = self.client.clone();
    self.pending.spawn(async move { client.mutate(mutation).await });
  }

  fn update_selected(&mut self, change: TaskChange) {
    if let Some(task) = self.selected_task() {
      self.dispatch(Mutation::UpdateTask { task, change });
    }
  }

  fn show_assignee_picker(&mut self) {
    let Some(task) = self.selected_task() else {
      return;
    };
    let mut options = vec![("No assignee".to_string(), AssigneeSelection::Unassigned)];
    options.extend(
      self
        .users
        .users()
        .iter()
        .map(|user| (format!("{} <{}>", user.name, user.email), AssigneeSelection::User(user.id))),
    );
    let current = match &task.assigned_to {
      Some(user) => AssigneeSelection::User(user.id),
      None => AssigneeSelection::Unassigned,
    };
    self
      .assignee_picker
      .show(format!("Assign {}", truncate(&task.title, 30)), options, Some(&current));
  }

  fn show_status_picker(&mut self) {
    let Some(task) = self.selected_task() else {
      return;
    };
    let options = TaskStatus::ALL
      .into_iter()
      .map(|status| (status.label().to_string(), status))
      .collect();
    self.status_picker.show("Status".to_string(), options, Some(&task.status));
  }

  fn render_info(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.project.title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let lines = vec![
      Line::from(vec![
        Span::styled("Owner: ", Style::default().fg(Color::DarkGray)),
        Span::styled(self.project.owner.name.clone(), Style::default().fg(Color::Yellow)),
      ]),
      Line::raw(self.project.description.clone()),
    ];
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }

  fn render_tasks(&mut self, frame: &mut Frame, area: Rect) {
    let tasks = self.sorted_tasks();
    ensure_valid_selection(&mut self.list_state, tasks.len());

    let title = if self.tasks.is_loading() {
      " Tasks (loading...) ".to_string()
    } else if let Some(err) = &self.tasks.last_error {
      format!(" Tasks (error: {}) ", err.user_message())
    } else {
      format!(" Tasks ({}) ", tasks.len())
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if tasks.is_empty() && !self.tasks.is_loading() {
      let content = if self.tasks.last_error.is_some() {
        "Failed to load tasks. Press 'r' to retry."
      } else {
        "No tasks yet. Press 'n' to add one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = tasks
      .iter()
      .map(|task| {
        let assignee = task
          .assigned_to
          .as_ref()
          .map(|u| u.name.as_str())
          .unwrap_or("unassigned");
        ListItem::new(Line::from(vec![
          Span::styled(format!("#{:<5}", task.id), Style::default().fg(Color::DarkGray)),
          Span::styled(
            format!("{:<12}", task.status.label()),
            Style::default().fg(status_color(task.status)),
          ),
          Span::styled(format!("{:<40}", truncate(&task.title, 40)), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::styled(truncate(assignee, 20), Style::default().fg(Color::Yellow)),
          Span::raw("  "),
          Span::styled(truncate(&task.description, 50), Style::default().fg(Color::DarkGray)),
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

impl Drop for ProjectDetailView {
  fn drop(&mut self) {
    self.client.session().close_project_if(self.project.id);
  }
}

impl View for ProjectDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        if let Ok([title, description]) = <[String; 2]>::try_from(values) {
          let project = self.project.clone();
          self.dispatch(Mutation::CreateTask {
            project,
            title,
            description,
          });
        }
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled if self.form.is_active() => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.status_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(status)) => {
        self.update_selected(TaskChange::Status(status));
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match self.assignee_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(selection)) => {
        self.update_selected(TaskChange::Assignee(selection));
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('n') => self.form.show(),
      KeyCode::Char('s') => self.show_status_picker(),
      KeyCode::Char('c') => {
        if let Some(task) = self.selected_task() {
          self.update_selected(TaskChange::Status(task.status.next()));
        }
      }
      KeyCode::Char('a') => self.show_assignee_picker(),
      KeyCode::Char('d') if self.is_owner() => {
        if let Some(task) = self.selected_task() {
          self.dispatch(Mutation::DeleteTask { task });
        }
      }
      KeyCode::Char('D') if self.is_owner() => {
        let project = self.project.clone();
        self.dispatch(Mutation::DeleteProject { project });
      }
      KeyCode::Char('r') => {
        self.client.refetch(CacheKey::Tasks {
          project: self.project.id,
        });
        self.client.refetch(CacheKey::Users);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.refresh();

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4),
        Constraint::Min(3),
        Constraint::Length(1),
      ])
      .split(area);

    self.render_info(frame, chunks[0]);
    self.render_tasks(frame, chunks[1]);

    let status = match (&self.message, &self.users.last_error) {
      (Some(message), _) => Line::styled(message.clone(), Style::default().fg(Color::Red)),
      (None, Some(err)) => Line::styled(
        format!("Users unavailable: {}", err.user_message()),
        Style::default().fg(Color::Red),
      ),
      (None, None) if self.pending.is_running() => {
        Line::styled("Saving...", Style::default().fg(Color::Yellow))
      }
      (None, None) => Line::raw(""),
    };
    frame.render_widget(Paragraph::new(status), chunks[2]);

    self.form.render_overlay(frame, area);
    self.status_picker.render_overlay(frame, area);
    self.assignee_picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.project.title.clone()
  }

  fn tick(&mut self) -> ViewAction {
    self.refresh();
    match self.pending.poll() {
      Some(Ok(MutationOutcome::ProjectDeleted(_))) => return ViewAction::Pop,
      Some(Ok(MutationOutcome::TaskCreated(_))) => self.form.hide(),
      Some(Ok(_)) => {}
      Some(Err(err)) if self.form.is_active() => self.form.set_error(Some(err.user_message())),
      Some(Err(err)) => self.message = Some(err.user_message()),
      None => {}
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new("n", "new task").with_priority(10),
      ShortcutInfo::new("s", "status").with_priority(20),
      ShortcutInfo::new("c", "cycle").with_priority(25),
      ShortcutInfo::new("a", "assign").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if self.is_owner() {
      shortcuts.push(ShortcutInfo::new("d", "delete task").with_priority(40));
      shortcuts.push(ShortcutInfo::new("D", "delete project").with_priority(50));
    }
    shortcuts
  }
}
