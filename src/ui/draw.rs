use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::config::RgbColor;
use crate::notify::NotificationKind;
use crate::validate::FieldState;
use crate::view::{Affordance, Avatar, CardView, Listing, SidebarItem};

use super::app::{App, PaneFocus};
use super::form::{self, FormField};
use super::panes::Panel;

const NAV_HELP: &str = "a: add  /: search  Tab: panel  q: quit";
const SEARCH_HELP: &str = "Type to filter by name, phone or email  Enter/Esc: back to list";
const FORM_HELP: &str = "Tab/Shift+Tab: field  Space: toggle  Enter: save  Esc: cancel";
const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";
const SIDEBAR_WIDTH: u16 = 34;
const FORM_LABEL_WIDTH: usize = 10;

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_form_modal(frame, size, app);
    draw_confirm_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let stats = &app.view.stats;
    let colors = app.ui_colors();
    let header_style = header_text_style(app);

    let spans = vec![
        Span::styled("QUICKDIAL", header_style.add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(format!("{} contacts", stats.total), header_style),
        Span::raw("   "),
        Span::styled(
            format!("★ {}", stats.favorites),
            Style::default().fg(color(colors.favorite)),
        ),
        Span::raw("   "),
        Span::styled(
            format!("✚ {}", stats.emergency),
            Style::default().fg(color(colors.emergency)),
        ),
    ];

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Min(0)])
        .split(area);

    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);
    frame.render_widget(
        Paragraph::new(app.store_description())
            .style(header_style)
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(SIDEBAR_WIDTH)])
        .split(area);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(columns[0]);

    draw_search(frame, main[0], app);
    draw_grid(frame, main[1], app);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);

    draw_sidebar(frame, sidebar[0], app, Panel::Favorites, &app.view.favorites);
    draw_sidebar(frame, sidebar[1], app, Panel::Emergency, &app.view.emergency);
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = app.focused_pane == PaneFocus::Search;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let label = "SEARCH: ";
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(app.search_input.value().to_string(), value_style),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    if active {
        let column = Span::raw(label).width() + app.search_input.visual_cursor();
        let x = inner.x.saturating_add(column as u16);
        frame.set_cursor_position((x, inner.y));
    }
}

fn panel_block(app: &App, panel: Panel, count: usize) -> Block<'static> {
    let active = app.focused_pane == PaneFocus::Panel(panel);
    let title = format!(" {} {} ({}) ", panel.digit(), panel.title(), count);
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active))
        .title(Line::from(Span::styled(title, header_text_style(app))))
}

fn panel_state(app: &App, panel: Panel, len: usize) -> ListState {
    let mut state = ListState::default();
    if len > 0 {
        state.select(Some(app.selected[panel.index()]));
    }
    state
}

fn highlight_style(app: &App, panel: Panel) -> Style {
    if app.focused_pane == PaneFocus::Panel(panel) {
        selection_style(app)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn draw_grid(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let grid = &app.view.grid;
    let block = panel_block(app, Panel::Grid, grid.len());

    if let Some(message) = grid.empty_message() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        render_centered_line(frame, inner, message);
        return;
    }

    let items: Vec<ListItem> = grid
        .items()
        .iter()
        .map(|card| build_card_item(card, app))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style(app, Panel::Grid))
        .highlight_symbol("▌")
        .repeat_highlight_symbol(true);

    let mut state = panel_state(app, Panel::Grid, grid.len());
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_sidebar(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &App,
    panel: Panel,
    listing: &Listing<SidebarItem>,
) {
    let block = panel_block(app, panel, listing.len());

    if let Some(message) = listing.empty_message() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        render_centered_line(frame, inner, message);
        return;
    }

    let items: Vec<ListItem> = listing
        .items()
        .iter()
        .map(|item| {
            let mut spans = Vec::from(avatar_spans(&item.avatar));
            spans.extend([
                Span::raw(" "),
                Span::raw(item.name.clone()),
                Span::styled(format!("  {}", item.phone), header_text_style(app)),
            ]);
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style(app, panel))
        .highlight_symbol(" ");

    let mut state = panel_state(app, panel, listing.len());
    frame.render_stateful_widget(list, area, &mut state);
}

fn build_card_item(card: &CardView, app: &App) -> ListItem<'static> {
    let colors = app.ui_colors();
    let mut title = Vec::from(avatar_spans(&card.avatar));
    title.extend([
        Span::raw(" "),
        Span::styled(card.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ]);
    if card.is_favorite {
        title.push(Span::styled("  ★", Style::default().fg(color(colors.favorite))));
    }
    if card.is_emergency {
        title.push(Span::styled(
            "  ✚ EMERGENCY",
            Style::default().fg(color(colors.emergency)),
        ));
    }

    let mut lines = vec![
        Line::from(title),
        Line::from(format!("    ☎ {}", card.phone)),
    ];

    if card.has_details() {
        let mut details = Vec::new();
        if let Some(email) = &card.email {
            details.push(format!("✉ {}", email));
        }
        if let Some(address) = &card.address {
            details.push(format!("⌂ {}", address));
        }
        lines.push(Line::from(format!("    {}", details.join("   "))));
    }

    if card.has_tags() {
        let mut tags = Vec::new();
        if let Some(group) = &card.group {
            tags.push(format!("[{}]", group));
        }
        if let Some(notes) = &card.notes {
            tags.push(notes.clone());
        }
        lines.push(Line::from(Span::styled(
            format!("    {}", tags.join(" ")),
            header_text_style(app),
        )));
    }
    lines.push(Line::from(""));

    ListItem::new(Text::from(lines))
}

/// Initial on the gradient's first stop, closed by a cell of the second.
fn avatar_spans(avatar: &Avatar) -> [Span<'static>; 2] {
    let gradient = avatar.gradient();
    [
        Span::styled(
            format!(" {}", avatar.initial),
            Style::default()
                .fg(Color::White)
                .bg(color(gradient.from))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ", Style::default().bg(color(gradient.to))),
    ]
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.ui_colors();
    let mut style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let message: String = if app.confirm_modal.is_some() {
        CONFIRM_HELP.to_string()
    } else if let Some((kind, text)) = app.toast.headline() {
        match kind {
            NotificationKind::Error => style = style.fg(color(colors.error)),
            NotificationKind::Warning => style = style.fg(color(colors.favorite)),
            NotificationKind::Success => style = style.fg(color(colors.valid)),
        }
        text.clone()
    } else if app.form.is_some() {
        FORM_HELP.to_string()
    } else if app.focused_pane == PaneFocus::Search {
        SEARCH_HELP.to_string()
    } else {
        navigation_help(app)
    };

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

/// Key hints for the actions the selected card offers.
fn navigation_help(app: &App) -> String {
    let card = app
        .selected_id()
        .and_then(|id| app.view.grid.items().iter().find(|card| card.id == id));
    let Some(card) = card else {
        return NAV_HELP.to_string();
    };

    let mut hints: Vec<&str> = card
        .affordances()
        .into_iter()
        .map(|affordance| match affordance {
            Affordance::Call => "c: call",
            Affordance::Email => "@: email",
            Affordance::Favorite => "f: favorite",
            Affordance::Emergency => "!: emergency",
            Affordance::Edit => "e: edit",
            Affordance::Delete => "d: delete",
        })
        .collect();
    hints.push(NAV_HELP);
    hints.join("  ")
}

fn draw_form_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(inputs) = app.form.as_ref() else {
        return;
    };

    let colors = app.ui_colors();
    let feedback = app.form_feedback();
    let values = app.form_values();
    let focus = inputs.focus();

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor_row = None;

    for field in FormField::ALL {
        let focused = field == focus;
        let label = format!("{:<width$} ", field.label(), width = FORM_LABEL_WIDTH);
        let label_style = if focused {
            selection_style(app)
        } else {
            header_text_style(app)
        };

        if field.is_toggle() {
            let mark = if form::is_checked(values, field) { "[x]" } else { "[ ]" };
            lines.push(Line::from(vec![
                Span::styled(label, label_style),
                Span::raw(mark),
            ]));
            continue;
        }

        if focused {
            cursor_row = Some(lines.len() as u16);
        }

        let state = match field.rule() {
            Some(crate::validate::Field::Name) => &feedback.name,
            Some(crate::validate::Field::Phone) => &feedback.phone,
            Some(crate::validate::Field::Email) => &feedback.email,
            None => &FieldState::Untouched,
        };

        let value_style = if state.is_invalid() {
            Style::default().fg(color(colors.error))
        } else {
            Style::default()
        };
        let mut spans = vec![
            Span::styled(label, label_style),
            Span::styled(inputs.value(field).to_string(), value_style),
        ];
        if *state == FieldState::Valid {
            spans.push(Span::styled(" ✓", Style::default().fg(color(colors.valid))));
        }
        lines.push(Line::from(spans));

        if let Some(message) = state.message() {
            lines.push(Line::from(Span::styled(
                format!("{:width$} {}", "", message, width = FORM_LABEL_WIDTH),
                Style::default().fg(color(colors.error)),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(FORM_HELP));

    let cursor_column = FORM_LABEL_WIDTH + 1 + inputs.visual_cursor();
    let title_line = Line::from(Span::styled(app.form_title(), header_text_style(app)));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(border_style(app, true));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);

    if let (Some(row), Some(popup_area)) = (cursor_row, app.modal_popup.area()) {
        let inner = Block::default().borders(Borders::ALL).inner(*popup_area);
        let x = inner.x.saturating_add(cursor_column as u16);
        let y = inner.y.saturating_add(row);
        frame.set_cursor_position((x, y));
    }
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.confirm_modal.as_ref() else {
        return;
    };

    let lines = vec![
        Line::from(modal.message.clone()),
        Line::from(""),
        Line::from(CONFIRM_HELP),
    ];

    let title_line = Line::from(Span::styled(modal.title.clone(), header_text_style(app)));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(border_style(app, true));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App, active: bool) -> Style {
    let colors = app.ui_colors();
    let style = Style::default().fg(color(colors.border));
    if active {
        style.add_modifier(Modifier::BOLD)
    } else {
        style.add_modifier(Modifier::DIM)
    }
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// Draw `text` on the middle row of `area`.
fn render_centered_line(frame: &mut Frame<'_>, area: Rect, text: &str) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let target = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1) / 2,
        width: area.width,
        height: 1,
    };

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            text.to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        )))
        .alignment(Alignment::Center),
        target,
    );
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
