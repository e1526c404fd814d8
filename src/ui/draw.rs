use anyhow::Result;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::config::RgbColor;
use crate::store::Profile;

use super::app::App;
use super::form::FormField;

const TILE_WIDTH: u16 = 18;
const TILE_HEIGHT: u16 = 7;

const TILES_HELP: &str = "←/→: move  Enter: select  e: edit  a: new  x: delete  ?: help  q: quit";
const FORM_HELP: &str = "Tab: next field  Enter: save  Esc: cancel";
const CONFIRM_HELP: &str = "y/Enter: confirm  n/Esc: cancel";
const HELP_FOOTER: &str = "any key: close";

pub fn render<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
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
    draw_tiles(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_form_modal(frame, size, app);
    draw_confirm_modal(frame, size, app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = Line::from(Span::styled(
        "WHO'S ON?",
        Style::default()
            .fg(color(app.config.ui.colors.selection_fg))
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(
        Paragraph::new(line).alignment(Alignment::Center),
        area,
    );
}

fn draw_tiles(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let profiles = app.profiles();
    if profiles.is_empty() || area.width == 0 || area.height == 0 {
        return;
    }

    let count = profiles.len() as u16;
    // Shrink tiles rather than overflow on narrow terminals
    let tile_width = TILE_WIDTH.min(area.width / count.max(1)).max(8);
    let row_width = tile_width * count;
    let tile_height = TILE_HEIGHT.min(area.height);

    let x = area.x + area.width.saturating_sub(row_width) / 2;
    let y = area.y + area.height.saturating_sub(tile_height) / 2;

    for (idx, profile) in profiles.iter().enumerate() {
        let tile_area = Rect {
            x: x + tile_width * idx as u16,
            y,
            width: tile_width,
            height: tile_height,
        };
        if tile_area.right() > area.right() {
            break;
        }
        draw_tile(frame, tile_area, app, profile, idx == app.selected);
    }
}

fn draw_tile(frame: &mut Frame<'_>, area: Rect, app: &App, profile: &Profile, focused: bool) {
    let colors = &app.config.ui.colors;
    let accent = parse_hex_color(&profile.color).unwrap_or(color(colors.border));

    let border = if focused {
        Style::default().fg(accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color(colors.dimmed))
    };

    let name_style = if focused {
        Style::default()
            .fg(color(colors.selection_fg))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color(colors.dimmed))
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::raw(profile.avatar.clone())),
        Line::from(""),
        Line::from(Span::styled(profile.name.clone(), name_style)),
    ];
    if profile.is_admin {
        lines.push(Line::from(Span::styled(
            "admin",
            Style::default().fg(color(colors.dimmed)),
        )));
    }

    let block = Block::default().borders(Borders::ALL).border_style(border);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = &app.config.ui.colors;
    let text = match &app.status {
        Some(status) => status.clone(),
        None => {
            if app.form.is_some() {
                FORM_HELP.to_string()
            } else if app.confirm_modal.is_some() {
                CONFIRM_HELP.to_string()
            } else {
                TILES_HELP.to_string()
            }
        }
    };

    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_form_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };

    let label_width = FormField::ALL
        .iter()
        .map(|f| f.label().len())
        .max()
        .unwrap_or(0);

    let selection = Style::default()
        .fg(color(app.config.ui.colors.selection_fg))
        .add_modifier(Modifier::BOLD);
    let dimmed = Style::default().fg(color(app.config.ui.colors.dimmed));

    let mut lines = Vec::new();
    for field in FormField::ALL {
        let label_style = if field == form.focused { selection } else { dimmed };
        let marker = if field == form.focused { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}{:<width$}: ", marker, field.label(), width = label_width),
                label_style,
            ),
            Span::raw(form.field_value(field).to_string()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(FORM_HELP.to_string()));

    let title = form.title();
    let focused = form.focused;
    let cursor_col = form.focused_input().visual_cursor();

    let title_line = Line::from(Span::styled(title, selection));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(Style::default().fg(color(app.config.ui.colors.border)));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);

    // Place the terminal cursor inside the focused field
    if let Some(popup_area) = app.modal_popup.area() {
        let inner = Block::default().borders(Borders::ALL).inner(*popup_area);
        let row = FormField::ALL.iter().position(|f| *f == focused).unwrap_or(0) as u16;
        let prefix = 2 + label_width as u16 + 2;
        let x = inner.x.saturating_add(prefix + cursor_col as u16);
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
        Line::from("".to_string()),
        Line::from(CONFIRM_HELP.to_string()),
    ];

    let selection = Style::default()
        .fg(color(app.config.ui.colors.selection_fg))
        .add_modifier(Modifier::BOLD);
    let title_line = Line::from(Span::styled(modal.title.clone(), selection));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(Style::default().fg(color(app.config.ui.colors.border)));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if !app.show_help {
        return;
    }

    let entries = app.help_entries();
    let action_width = entries
        .iter()
        .map(|e| e.action.len())
        .max()
        .unwrap_or(0);

    let width = area.width.saturating_mul(2).saturating_div(3).max(30).min(area.width);
    let height = ((entries.len() + 4) as u16).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let dimmed = Style::default().fg(color(app.config.ui.colors.dimmed));
    let mut lines: Vec<Line> = entries
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::raw(format!(" {:<width$}  ", entry.action, width = action_width)),
                Span::styled(entry.keys.clone(), dimmed),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(HELP_FOOTER, dimmed)));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" KEYS ")
        .border_style(Style::default().fg(color(app.config.ui.colors.border)));
    frame.render_widget(Paragraph::new(lines).block(block), modal_area);
}

fn color(value: RgbColor) -> Color {
    Color::Rgb(value.r, value.g, value.b)
}

/// Parse `#rgb` or `#rrggbb` accents; anything else falls back to the
/// configured border color.
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let (r, g, b) = match hex.len() {
        3 => {
            let digit = |at: usize| u8::from_str_radix(&hex[at..at + 1], 16).ok();
            (digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)
        }
        6 => {
            let pair = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
            (pair(0)?, pair(2)?, pair(4)?)
        }
        _ => return None,
    };
    Some(Color::Rgb(r, g, b))
}
