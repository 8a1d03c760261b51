use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::accounts::{AccountType, BankAccount};
use crate::app::{App, AppMode, Dialog, LoginField, QuickAction, Screen};
use crate::constants::constants;
use crate::feed::Phase;
use crate::filters::FilterCategory;
use crate::graphics::{PreviewWidget, fit_area, prepare};
use crate::session::format_money;
use crate::theme::{Theme, parse_hex};

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// `1234567` → `1,234,567`.
fn group_digits(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(ch);
  }
  out
}

/// The part of `text` that fits in `width` columns with the cursor visible.
/// Adjusts `scroll` and returns the visible text with the cursor's column in it.
fn scroll_field(text: &str, cursor: usize, scroll: &mut usize, width: usize) -> (String, usize) {
  let cursor_col = display_width(text, cursor);
  if cursor_col < *scroll {
    *scroll = cursor_col;
  } else if width > 0 && cursor_col >= *scroll + width {
    *scroll = cursor_col + 1 - width;
  }
  let offset = *scroll;
  let visible = text
    .chars()
    .scan(0usize, |col, c| {
      let start = *col;
      *col += c.width().unwrap_or(0);
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= offset)
    .take_while(|(start, _, _)| *start < offset + width)
    .map(|(_, _, c)| c)
    .collect();
  (visible, cursor_col - offset)
}

/// First entry to draw so that entry `cursor` still fits in `width` columns.
fn window_start(widths: &[usize], cursor: usize, width: usize) -> usize {
  if widths.is_empty() {
    return 0;
  }
  let cursor = cursor.min(widths.len() - 1);
  let mut start = 0;
  while start < cursor && widths[start..=cursor].iter().sum::<usize>() > width {
    start += 1;
  }
  start
}

fn panel<'a>(theme: &Theme, title: impl Into<Line<'a>>) -> Block<'a> {
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let [row] = Layout::vertical([Constraint::Length(height.min(area.height))]).flex(Flex::Center).areas(area);
  let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))]).flex(Flex::Center).areas(row);
  cell
}

fn field_line<'a>(theme: &Theme, label: &'a str, value: String) -> Line<'a> {
  Line::from(vec![
    Span::styled(format!("{:<11}", label), Style::default().fg(theme.muted)),
    Span::styled(value, Style::default().fg(theme.fg)),
  ])
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.gfx.preview_area = None;
  app.results_viewport = None;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg).fg(theme.fg)), frame.area());

  let [header_area, main_area, status_area, footer_area] =
    Layout::vertical([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
      .areas(frame.area());

  render_header(frame, app, header_area);
  match app.screen {
    Screen::Welcome => render_welcome(frame, theme, main_area),
    Screen::Login => render_login(frame, app, main_area),
    Screen::Dashboard => render_dashboard(frame, app, main_area),
    Screen::Browser => render_browser(frame, app, main_area),
    Screen::Detail => render_detail(frame, app, main_area),
    Screen::About => render_about(frame, app, main_area),
  }
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);

  if let Some(ref dialog) = app.dialog {
    render_dialog(frame, theme, dialog, main_area);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ◆ pixels ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let mut right = format!("v{} ", env!("CARGO_PKG_VERSION"));
  if app.user.is_logged_in
    && let Some(ref username) = app.user.username
  {
    right = format!("{}  ·  {}", username, right);
  }
  let width = (right.chars().count() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width, ..area };
  frame.render_widget(Line::from(Span::styled(right, Style::default().fg(theme.muted))), right_area);
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("◆  Welcome to pixels", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Browse Pixabay images and your accounts. In the terminal.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Press Enter to get started.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_about(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let heading = |s: &'static str| Line::from(Span::styled(s, Style::default().fg(theme.accent).bold()));
  let text = vec![
    Line::from(""),
    heading("About pixels"),
    Line::from(""),
    field_line(theme, "Version", env!("CARGO_PKG_VERSION").to_string()),
    field_line(theme, "Images", "Pixabay API (pixabay.com), safe search, editors' choice".to_string()),
    field_line(theme, "Accounts", "Demo data: john.doe, jane.smith, demo".to_string()),
    field_line(theme, "Display", app.display_mode.label().to_string()),
    field_line(theme, "Biometric", app.capabilities.biometric_type.clone()),
    Line::from(""),
    heading("Browsing"),
    Line::from(""),
    Line::from("Type to search (3+ characters), pick a category, or narrow results with filters."),
    Line::from("Scrolling to the end of the list loads the next page."),
  ];
  let paragraph = Paragraph::new(text)
    .wrap(Wrap { trim: false })
    .block(panel(theme, " About ").padding(Padding::horizontal(2)));
  frame.render_widget(paragraph, area);
}

// --- Login ---

fn render_input_box(frame: &mut Frame, theme: &Theme, title: &str, value: &str, focused: bool, area: Rect) {
  let border = if focused { theme.accent } else { theme.border };
  let block = Block::bordered()
    .title(format!(" {} ", title))
    .title_style(Style::default().fg(border))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border))
    .padding(Padding::horizontal(1));
  let visible = truncate_str(value, area.width.saturating_sub(4) as usize);
  frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let form_area = centered(area, 56, 18);
  let block = panel(theme, " Sign in ").padding(Padding::horizontal(2));
  let inner = block.inner(form_area);
  frame.render_widget(block, form_area);

  let [intro_area, user_area, pass_area, message_area, hint_area] = Layout::vertical([
    Constraint::Length(3),
    Constraint::Length(3),
    Constraint::Length(3),
    Constraint::Length(2),
    Constraint::Min(1),
  ])
  .areas(inner);

  let intro = vec![
    Line::from(Span::styled("Welcome!", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(Span::styled("Please enter your login credentials to get started", Style::default().fg(theme.muted))),
  ];
  frame.render_widget(Paragraph::new(intro).wrap(Wrap { trim: true }), intro_area);

  let form = &app.login;
  let masked = "•".repeat(form.password.chars().count());
  render_input_box(frame, theme, "Username", &form.username, form.focus == LoginField::Username, user_area);
  render_input_box(frame, theme, "Password", &masked, form.focus == LoginField::Password, pass_area);

  let message = if app.user.loading {
    Line::from(Span::styled("Signing in…", Style::default().fg(theme.status)))
  } else if let Some(ref err) = app.user.error {
    Line::from(Span::styled(err.as_str(), Style::default().fg(theme.error)))
  } else {
    Line::from("")
  };
  frame.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), message_area);

  let mut hints = Vec::new();
  if app.user.biometric_enabled && app.capabilities.is_available {
    hints.push(Line::from(vec![
      Span::styled(" ^b ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(format!(" Sign in with {}", app.capabilities.biometric_type), Style::default().fg(theme.fg)),
    ]));
  }
  hints.push(Line::from(Span::styled("Demo users: john.doe, jane.smith, demo", Style::default().fg(theme.muted))));
  frame.render_widget(Paragraph::new(hints), hint_area);

  if app.dialog.is_none() && !app.user.loading {
    let (field_area, col) = match form.focus {
      LoginField::Username => (user_area, display_width(&form.username, form.cursor)),
      LoginField::Password => (pass_area, form.cursor),
    };
    let max_col = field_area.width.saturating_sub(4) as usize;
    frame.set_cursor_position((field_area.x + 2 + col.min(max_col) as u16, field_area.y + 1));
  }
}

// --- Dashboard ---

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let [greeting_area, body_area] = Layout::vertical([Constraint::Length(2), Constraint::Min(3)]).areas(area);

  let mut greeting = vec![Span::styled(
    format!(" Hello, {}", app.user.display_name()),
    Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
  )];
  if let Some(ref email) = app.user.email {
    greeting.push(Span::styled(format!("  ·  {}", email), Style::default().fg(theme.muted)));
  }
  frame.render_widget(Line::from(greeting), greeting_area);

  let [cards_area, side_area] =
    Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(body_area);
  render_accounts(frame, app, cards_area);

  let summary_height = AccountType::ALL.len() as u16 + 4;
  let [summary_area, actions_area] =
    Layout::vertical([Constraint::Length(summary_height), Constraint::Min(3)]).areas(side_area);
  render_summary(frame, app, summary_area);
  render_actions(frame, app, actions_area);
}

fn render_accounts(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = panel(theme, " Accounts ");
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let accounts = &app.user.bank_accounts;
  let placeholder = if app.user.loading && accounts.is_empty() {
    Some(Span::styled("Loading accounts…", Style::default().fg(theme.status)))
  } else if let Some(ref err) = app.user.error {
    Some(Span::styled(err.as_str(), Style::default().fg(theme.error)))
  } else if accounts.is_empty() {
    Some(Span::styled("No accounts yet.", Style::default().fg(theme.muted)))
  } else {
    None
  };
  if let Some(span) = placeholder {
    frame.render_widget(Paragraph::new(Line::from(span)).alignment(Alignment::Center), inner);
    return;
  }

  let rows = Layout::vertical(accounts.iter().map(|_| Constraint::Length(4))).split(inner);
  for (account, card_area) in accounts.iter().zip(rows.iter()) {
    render_card(frame, theme, account, *card_area);
  }
}

fn render_card(frame: &mut Frame, theme: &Theme, account: &BankAccount, area: Rect) {
  let color = parse_hex(&account.card_color).unwrap_or(theme.accent);
  let block = Block::bordered()
    .title(Span::styled(format!(" {} ", account.bank_name), Style::default().fg(color).add_modifier(Modifier::BOLD)))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
    .padding(Padding::horizontal(1));
  let balance_color = if account.balance < 0.0 { theme.error } else { theme.success };
  let lines = vec![
    Line::from(vec![
      Span::styled(account.account_type.label(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
      Span::styled(format!("  {}", account.account_number), Style::default().fg(theme.muted)),
    ]),
    Line::from(Span::styled(
      format_money(account.balance, &account.currency),
      Style::default().fg(balance_color).add_modifier(Modifier::BOLD),
    )),
  ];
  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let currency = app.user.bank_accounts.first().map_or("USD", |a| a.currency.as_str());
  let mut lines = vec![
    Line::from(vec![
      Span::styled(format!("{:<11}", "Net worth"), Style::default().fg(theme.muted)),
      Span::styled(
        format_money(app.user.net_worth(), currency),
        Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
      ),
    ]),
    Line::from(""),
  ];
  lines.extend(
    AccountType::ALL.iter().map(|t| field_line(theme, t.label(), format_money(app.user.total_for(*t), currency))),
  );
  frame.render_widget(Paragraph::new(lines).block(panel(theme, " Summary ").padding(Padding::horizontal(1))), area);
}

fn render_actions(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let items: Vec<ListItem> =
    QuickAction::ALL.iter().map(|a| ListItem::new(Span::styled(a.label(), Style::default().fg(theme.fg)))).collect();
  let list = List::new(items)
    .block(panel(theme, " Quick actions "))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  let mut state = ListState::default().with_selected(Some(app.action_index));
  frame.render_stateful_widget(list, area, &mut state);
}

// --- Image browser ---

fn render_browser(frame: &mut Frame, app: &mut App, area: Rect) {
  let [search_area, category_area, chips_area, body_area] = Layout::vertical([
    Constraint::Length(3),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Min(3),
  ])
  .areas(area);

  render_search(frame, app, search_area);
  render_categories(frame, app, category_area);
  render_chips(frame, app, chips_area);

  let [list_area, preview_area] =
    Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(body_area);
  render_results(frame, app, list_area);
  render_preview(frame, app, preview_area);

  if app.mode == AppMode::Filters {
    render_filter_editor(frame, app, body_area);
  }
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Input;
  let border_color = if focused { theme.accent } else { theme.border };
  let typed = app.feed.typed_term().chars().count();
  let min_len = constants().min_search_len;
  let title = if typed > 0 && typed < min_len {
    format!(" Search images · at least {} characters ", min_len)
  } else {
    " Search images ".to_string()
  };
  let block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let (visible, cursor_col) = scroll_field(&app.input, app.cursor_position, &mut app.input_scroll, inner_w);
  let paragraph = if app.input.is_empty() && !focused {
    Paragraph::new(Span::styled("Press / to search", Style::default().fg(theme.muted)))
  } else {
    Paragraph::new(visible).style(Style::default().fg(theme.fg))
  };
  frame.render_widget(paragraph.block(block), area);

  if focused {
    frame.set_cursor_position((area.x + 2 + cursor_col as u16, area.y + 1));
  }
}

fn render_categories(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let active = app.feed.category();
  let picking = app.mode == AppMode::Categories;
  let labels: Vec<(Option<&str>, String)> =
    App::category_entries().map(|e| (e, format!(" {} ", e.unwrap_or("all")))).collect();
  let widths: Vec<usize> = labels.iter().map(|(_, l)| l.chars().count() + 1).collect();
  let focus = if picking { app.category_cursor } else { labels.iter().position(|(e, _)| *e == active).unwrap_or(0) };
  let start = window_start(&widths, focus, area.width as usize);

  let spans: Vec<Span> = labels
    .into_iter()
    .enumerate()
    .skip(start)
    .flat_map(|(i, (entry, label))| {
      let style = if picking && i == app.category_cursor {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else if entry == active {
        Style::default().fg(theme.accent).bg(theme.chip_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.muted)
      };
      [Span::styled(label, style), Span::raw(" ")]
    })
    .collect();
  frame.render_widget(Line::from(spans), area);
}

fn render_chips(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" Filters  ", Style::default().fg(theme.muted))];
  match app.feed.filters().filter(|f| !f.is_empty()) {
    None => spans.push(Span::styled("none · press f to add", Style::default().fg(theme.muted))),
    Some(filters) => {
      for (i, (category, value)) in filters.iter().enumerate() {
        spans.push(Span::styled(
          format!(" {} {}: {} ✕ ", i + 1, category.label(), value),
          Style::default().fg(theme.fg).bg(theme.chip_bg),
        ));
        spans.push(Span::raw(" "));
      }
    }
  }
  frame.render_widget(Line::from(spans), area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  app.results_viewport = Some(area.height.saturating_sub(2));

  let loading = app.feed.phase() == Phase::Fetching;
  let count = app.feed.store().len();
  let mut title = match app.feed.total_hits() {
    Some(total) => format!(" Results · {} of {} ", count, total),
    None => " Results ".to_string(),
  };
  if loading && count > 0 {
    title.push_str("(loading more…) ");
  } else if app.feed.is_exhausted() && count > 0 {
    title.push_str("(end) ");
  }
  let border = if app.mode == AppMode::Results { theme.accent } else { theme.border };
  let block = panel(theme, title).border_style(Style::default().fg(border));

  if app.feed.store().is_empty() {
    let message = if loading {
      "Loading images…"
    } else if app.feed.last_error.is_some() {
      "Could not load images."
    } else {
      "No images found."
    };
    let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(message, Style::default().fg(theme.muted)))])
      .alignment(Alignment::Center)
      .block(block);
    frame.render_widget(paragraph, area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected = app.list_state.selected();
  let items: Vec<ListItem> = app
    .feed
    .store()
    .items()
    .iter()
    .enumerate()
    .map(|(i, hit)| {
      let fg = if Some(i) == selected { theme.highlight_fg } else { theme.fg };
      let bg = if Some(i) == selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };
      let tags = hit.short_tags(3);
      let label = if tags.is_empty() { format!("#{}", hit.id) } else { tags };
      let right = format!("♥ {}  {}", group_digits(hit.likes), hit.user);
      let right_w = right.chars().count();
      let label = truncate_str(&label, inner_w.saturating_sub(right_w + 2));
      let gap = inner_w.saturating_sub(label.chars().count() + right_w);
      let line = Line::from(vec![
        Span::styled(label, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(line).style(Style::default().bg(bg))
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Draw the screen's visible image into `target`: as cells, or by recording
/// the area for the run loop to send over a graphics protocol.
fn draw_image(frame: &mut Frame, app: &mut App, target: Rect, allow_graphics: bool) {
  let mode = app.display_mode;
  if mode.is_graphics_protocol() {
    if allow_graphics {
      app.gfx.preview_area = Some(target);
    }
    return;
  }
  let Some((id, image)) = app.visible_image() else { return };
  let fresh = matches!(app.gfx.resized, Some((rid, w, h, _)) if rid == id && w == target.width && h == target.height);
  let prepared = (!fresh).then(|| prepare(image, target, mode));
  if let Some(prepared) = prepared {
    app.gfx.resized = Some((id, target.width, target.height, prepared));
  }
  if let Some((_, _, _, ref resized)) = app.gfx.resized {
    frame.render_widget(PreviewWidget { image: resized, display_mode: mode }, target);
  }
}

fn render_preview(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = panel(theme, " Preview ");
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let Some(hit) = app.selected_hit() else { return };
  let (id, aspect) = (hit.id, hit.aspect_ratio());
  let caption = format!("{}×{} · {}", hit.image_width, hit.image_height, hit.user);

  let [image_area, caption_area] = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
  frame.render_widget(
    Paragraph::new(truncate_str(&caption, caption_area.width as usize))
      .style(Style::default().fg(theme.muted))
      .alignment(Alignment::Center),
    caption_area,
  );

  if app.previews.contains_key(&id) {
    let allow_graphics = app.mode != AppMode::Filters;
    draw_image(frame, app, fit_area(image_area, aspect), allow_graphics);
  } else {
    let loading = Paragraph::new(Span::styled("Loading preview…", Style::default().fg(theme.muted)))
      .alignment(Alignment::Center);
    frame.render_widget(loading, centered(image_area, image_area.width, 1));
  }
}

fn render_filter_editor(frame: &mut Frame, app: &App, area: Rect) {
  let Some(editor) = app.feed.editor.as_ref() else { return };
  let theme = app.theme();
  let height = FilterCategory::ALL.len() as u16 * 2 + 4;
  let popup = centered(area, 100, height);
  frame.render_widget(Clear, popup);

  let (row, col) = editor.cursor();
  let mut lines = Vec::new();
  for (r, category) in FilterCategory::ALL.iter().enumerate() {
    let label_style = if r == row {
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.muted)
    };
    let mut spans = vec![Span::styled(format!("{:<12}", category.label()), label_style)];
    for (c, option) in category.options().iter().enumerate() {
      let chosen = editor.draft.get(*category) == Some(option.as_str());
      let style = if r == row && c == col {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else if chosen {
        Style::default().fg(theme.accent).bg(theme.chip_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.fg)
      };
      spans.push(Span::styled(format!(" {} ", option), style));
    }
    lines.push(Line::from(spans));
    lines.push(Line::from(""));
  }
  lines.push(Line::from(Span::styled(
    "Space toggle · Enter apply · r reset · Esc cancel",
    Style::default().fg(theme.muted),
  )));

  let block = panel(theme, " Filters ").padding(Padding::horizontal(1)).style(Style::default().bg(theme.bg));
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), popup);
}

// --- Detail ---

fn render_detail(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some(hit) = app.detail_hit().cloned() else { return };
  let [image_area, info_area] =
    Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).areas(area);

  let block = panel(theme, format!(" Image #{} ", hit.id));
  let inner = block.inner(image_area);
  frame.render_widget(block, image_area);
  if app.detail_image.is_some() {
    draw_image(frame, app, fit_area(inner, hit.aspect_ratio()), true);
  } else {
    let loading =
      Paragraph::new(Span::styled("Loading image…", Style::default().fg(theme.muted))).alignment(Alignment::Center);
    frame.render_widget(loading, centered(inner, inner.width, 1));
  }

  let inner_w = info_area.width.saturating_sub(4) as usize;
  let mut lines = vec![
    Line::from(""),
    Line::from(Span::styled(
      truncate_str(&hit.short_tags(usize::MAX), inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    field_line(theme, "By", truncate_str(&hit.user, inner_w.saturating_sub(11))),
    field_line(theme, "Size", format!("{} × {}", hit.image_width, hit.image_height)),
    field_line(theme, "Likes", group_digits(hit.likes)),
    field_line(theme, "Downloads", group_digits(hit.downloads)),
    field_line(theme, "Views", group_digits(hit.views)),
    Line::from(""),
  ];
  if !hit.page_url.is_empty() {
    lines.push(Line::from(Span::styled(
      truncate_str(&hit.page_url, inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )));
  }
  let info_title = Line::from(vec![
    Span::styled(" Details ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", app.display_mode.label()), Style::default().fg(theme.muted)),
  ]);
  let paragraph = Paragraph::new(lines).block(panel(theme, info_title).padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, info_area);
}

// --- Chrome ---

fn render_dialog(frame: &mut Frame, theme: &Theme, dialog: &Dialog, area: Rect) {
  let (title, question, yes, no) = match dialog {
    Dialog::EnrollBiometric(capabilities) => (
      " Enable Biometric Login ",
      format!("Would you like to use {} for quick and secure sign-in?", capabilities.biometric_type),
      "Enable",
      "Not Now",
    ),
    Dialog::ConfirmLogout => (" Logout ", "Are you sure you want to logout?".to_string(), "Logout", "Cancel"),
  };
  let popup = centered(area, 52, 7);
  frame.render_widget(Clear, popup);
  let lines = vec![
    Line::from(Span::styled(question, Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(vec![
      Span::styled(" y ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(format!(" {}   ", yes), Style::default().fg(theme.fg)),
      Span::styled(" n ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(format!(" {}", no), Style::default().fg(theme.muted)),
    ]),
  ];
  let block = panel(theme, title).padding(Padding::horizontal(1)).style(Style::default().bg(theme.bg));
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), popup);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let browsing = matches!(app.screen, Screen::Browser | Screen::Detail);
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.user.loading {
    (" ⏳ Working…".to_string(), Style::default().fg(theme.status))
  } else if browsing && app.feed.phase() == Phase::Fetching {
    (format!(" ⏳ Loading page {}…", app.feed.page()), Style::default().fg(theme.status))
  } else if let Some(info) = &app.info_message {
    (format!(" ✓ {}", info), Style::default().fg(theme.success))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn footer_keys(app: &App) -> Vec<(&'static str, &'static str)> {
  if app.dialog.is_some() {
    return vec![("y", "Yes"), ("n", "No")];
  }
  let mut keys = match app.screen {
    Screen::Welcome => vec![("Enter", "Continue"), ("a", "About"), ("q", "Quit")],
    Screen::Login => {
      let mut k = vec![("Enter", "Sign in"), ("Tab", "Next field")];
      if app.user.biometric_enabled && app.capabilities.is_available {
        k.push(("^b", "Biometric"));
      }
      k.push(("Esc", "Back"));
      k
    }
    Screen::Dashboard => vec![("j/k", "Select"), ("Enter", "Run"), ("b", "Browse"), ("r", "Refresh"), ("l", "Log out")],
    Screen::Browser => match app.mode {
      AppMode::Input => vec![("Enter", "Search"), ("Esc", "Clear"), ("↓", "Results")],
      AppMode::Results => vec![
        ("Enter", "Details"),
        ("/", "Search"),
        ("c", "Category"),
        ("f", "Filters"),
        ("1-9", "Remove filter"),
        ("g", "Top"),
        ("Esc", "Dashboard"),
      ],
      AppMode::Filters => vec![("Space", "Toggle"), ("Enter", "Apply"), ("r", "Reset"), ("Esc", "Cancel")],
      AppMode::Categories => vec![("←/→", "Move"), ("Enter", "Select"), ("Esc", "Back")],
    },
    Screen::Detail => vec![("o", "Open in browser"), ("Esc", "Back")],
    Screen::About => vec![("Esc", "Back")],
  };
  keys.push(("^t", "Theme"));
  keys
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys = footer_keys(app);
  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();
  frame.render_widget(Line::from(spans), area);

  let label = format!("{} · {} ", theme.name, app.display_mode.label());
  let width = (label.chars().count() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width, ..area };
  frame.render_widget(Line::from(Span::styled(label, Style::default().fg(theme.muted))), right_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_appends_ellipsis() {
    assert_eq!(truncate_str("mountain lake", 8), "mountai…");
    assert_eq!(truncate_str("lake", 8), "lake");
  }

  #[test]
  fn digits_are_grouped() {
    assert_eq!(group_digits(0), "0");
    assert_eq!(group_digits(999), "999");
    assert_eq!(group_digits(7671), "7,671");
    assert_eq!(group_digits(1234567), "1,234,567");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("日本a", 3), 5);
    assert_eq!(display_width("abc", 2), 2);
  }

  #[test]
  fn field_scrolls_to_keep_cursor_visible() {
    let mut scroll = 0;
    let (visible, col) = scroll_field("hello world", 11, &mut scroll, 5);
    assert_eq!(scroll, 7);
    assert_eq!(visible, "orld");
    assert_eq!(col, 4);

    let (visible, col) = scroll_field("hello world", 0, &mut scroll, 5);
    assert_eq!(scroll, 0);
    assert_eq!(visible, "hello");
    assert_eq!(col, 0);
  }

  #[test]
  fn category_window_keeps_cursor_on_screen() {
    let widths = [5, 5, 5, 5];
    assert_eq!(window_start(&widths, 3, 10), 2);
    assert_eq!(window_start(&widths, 1, 10), 0);
    assert_eq!(window_start(&widths, 9, 100), 0);
    assert_eq!(window_start(&[], 0, 10), 0);
  }
}
