use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode, Dialog, QuickAction, Screen};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Outcome of feeding a key to a single-line text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
  Changed,
  Moved,
  Ignored,
}

/// Apply an editing key to `text` with a char-indexed `cursor`.
pub fn edit_text(text: &mut String, cursor: &mut usize, code: KeyCode) -> Edit {
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(text, *cursor);
      text.insert(byte_idx, c);
      *cursor += 1;
      Edit::Changed
    }
    KeyCode::Backspace if *cursor > 0 => {
      *cursor -= 1;
      let byte_idx = char_to_byte_index(text, *cursor);
      text.remove(byte_idx);
      Edit::Changed
    }
    KeyCode::Delete if *cursor < text.chars().count() => {
      let byte_idx = char_to_byte_index(text, *cursor);
      text.remove(byte_idx);
      Edit::Changed
    }
    KeyCode::Left => {
      *cursor = cursor.saturating_sub(1);
      Edit::Moved
    }
    KeyCode::Right => {
      if *cursor < text.chars().count() {
        *cursor += 1;
      }
      Edit::Moved
    }
    KeyCode::Home => {
      *cursor = 0;
      Edit::Moved
    }
    KeyCode::End => {
      *cursor = text.chars().count();
      Edit::Moved
    }
    _ => Edit::Ignored,
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  app.info_message = None;

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  if app.dialog.is_some() {
    handle_dialog_key(app, key);
    return;
  }

  match app.screen {
    Screen::Welcome => handle_welcome_key(app, key),
    Screen::Login => handle_login_key(app, key),
    Screen::Dashboard => handle_dashboard_key(app, key),
    Screen::Browser => match app.mode {
      AppMode::Input => handle_input_key(app, key),
      AppMode::Results => handle_results_key(app, key),
      AppMode::Filters => handle_filters_key(app, key),
      AppMode::Categories => handle_categories_key(app, key),
    },
    Screen::Detail => handle_detail_key(app, key),
    Screen::About => {
      if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
        app.close_about();
      }
    }
  }
}

fn handle_dialog_key(app: &mut App, key: event::KeyEvent) {
  let answer = match key.code {
    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
    _ => return,
  };
  match app.dialog {
    Some(Dialog::EnrollBiometric(_)) => app.answer_enrollment(answer),
    Some(Dialog::ConfirmLogout) => app.confirm_logout(answer),
    None => {}
  }
}

fn handle_welcome_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Char(' ') => app.leave_welcome(),
    KeyCode::Char('a') => app.open_about(),
    KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_login_key(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('b') {
    app.trigger_biometric_login();
    return;
  }
  match key.code {
    KeyCode::Enter => app.submit_login(),
    KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.login.toggle_focus(),
    KeyCode::Esc => {
      app.screen = Screen::Welcome;
    }
    code => {
      let mut cursor = app.login.cursor;
      if edit_text(app.login.active_mut(), &mut cursor, code) == Edit::Changed {
        app.clear_error();
        app.user.clear_error();
      }
      app.login.cursor = cursor;
    }
  }
}

fn handle_dashboard_key(app: &mut App, key: event::KeyEvent) {
  let count = QuickAction::ALL.len();
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.action_index = (app.action_index + 1) % count,
    KeyCode::Up | KeyCode::Char('k') => app.action_index = (app.action_index + count - 1) % count,
    KeyCode::Enter => app.run_quick_action(),
    KeyCode::Char('b') => app.open_browser(),
    KeyCode::Char('r') => app.trigger_accounts(),
    KeyCode::Char('a') => app.open_about(),
    KeyCode::Char('l') => app.request_logout(),
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.submit_search();
      app.mode = AppMode::Results;
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.clear_search();
      } else {
        app.mode = AppMode::Results;
      }
    }
    KeyCode::Down => app.mode = AppMode::Results,
    code => {
      let mut cursor = app.cursor_position;
      if edit_text(&mut app.input, &mut cursor, code) == Edit::Changed {
        app.on_input_changed();
      }
      app.cursor_position = cursor;
    }
  }
}

fn handle_results_key(app: &mut App, key: event::KeyEvent) {
  let page = app.results_viewport.unwrap_or(10).max(1) as usize;
  match key.code {
    KeyCode::Enter => app.open_detail(),
    KeyCode::Down | KeyCode::Char('j') => app.select_next(1),
    KeyCode::Up | KeyCode::Char('k') => app.select_previous(1),
    KeyCode::PageDown => app.select_next(page),
    KeyCode::PageUp => app.select_previous(page),
    KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
    KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
    KeyCode::Char('/') | KeyCode::Char('s') => {
      app.cursor_position = app.input.chars().count();
      app.mode = AppMode::Input;
    }
    KeyCode::Char('f') => app.open_filters(),
    KeyCode::Char('c') => app.mode = AppMode::Categories,
    KeyCode::Char('x') => app.clear_search(),
    KeyCode::Char('a') => app.open_about(),
    KeyCode::Char(d @ '1'..='9') => app.remove_chip(d as usize - '1' as usize),
    KeyCode::Esc => app.enter_dashboard(),
    _ => {}
  }
}

fn handle_filters_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.apply_filter_draft();
      return;
    }
    KeyCode::Char('r') => {
      app.reset_filters();
      return;
    }
    KeyCode::Esc => {
      app.cancel_filters();
      return;
    }
    _ => {}
  }
  let Some(editor) = app.feed.editor.as_mut() else {
    app.mode = AppMode::Results;
    return;
  };
  match key.code {
    KeyCode::Up | KeyCode::Char('k') => editor.move_up(),
    KeyCode::Down | KeyCode::Char('j') => editor.move_down(),
    KeyCode::Left | KeyCode::Char('h') => editor.move_left(),
    KeyCode::Right | KeyCode::Char('l') => editor.move_right(),
    KeyCode::Char(' ') => editor.toggle_current(),
    _ => {}
  }
}

fn handle_categories_key(app: &mut App, key: event::KeyEvent) {
  let count = App::category_entries().count();
  match key.code {
    KeyCode::Left | KeyCode::Char('h') => app.category_cursor = app.category_cursor.saturating_sub(1),
    KeyCode::Right | KeyCode::Char('l') => app.category_cursor = (app.category_cursor + 1).min(count - 1),
    KeyCode::Enter | KeyCode::Char(' ') => {
      app.select_category_at_cursor();
      app.mode = AppMode::Results;
    }
    KeyCode::Esc | KeyCode::Char('c') => app.mode = AppMode::Results,
    _ => {}
  }
}

fn handle_detail_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char('o') => app.open_in_browser(),
    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => app.close_detail(),
    _ => {}
  }
}
