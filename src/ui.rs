use crate::{
    catalog::TypeKind,
    client::AppSnapshot,
    reaction::Shock,
    session::{
        DEX_END,
        Direction,
        SessionPhase,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use rand::Rng;
use ratatui::{
    layout::Direction as LayoutDirection,
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthChar;

const DEFAULT_SHOCK_TEXT: &str = "WHAT IS WRONG WITH YOU?";
const ENDING_TEXT: &str = "Nice! You're a Degenerate!";

pub enum UserEvent {
    Quit,
    Advance,
    Retreat,
    Swipe(Direction),
    CycleStyle,
    ReplayEnding,
    RetryFetch,
    Redraw,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    celebrating: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            celebrating: false,
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    Shock {
        message: Option<&'static str>,
    },
    QuitModal,
}

impl UiState {
    pub fn show_shock(&mut self, shock: &Shock) {
        self.mode = Mode::Shock {
            message: shock.message,
        };
    }

    pub fn clear_shock(&mut self) {
        if matches!(self.mode, Mode::Shock { .. }) {
            self.mode = Mode::Normal;
        }
    }

    pub fn start_celebration(&mut self) {
        self.celebrating = true;
    }
}

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(Ok(event)) => Ok(event),
        Some(Err(err)) => Err(eyre!("input stream error: {err}")),
        None => Err(eyre!("input stream closed")),
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) => key,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match &state.mode {
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        // While the shock sequence plays, further swipes for the same card
        // are swallowed; backing away is still allowed.
        Mode::Shock { .. } => match key.code {
            KeyCode::Down | KeyCode::Char('j') => Some(UserEvent::Retreat),
            KeyCode::Up | KeyCode::Char('k') => Some(UserEvent::Advance),
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => {
            if state.celebrating {
                state.celebrating = false;
                return Some(UserEvent::Redraw);
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    state.mode = Mode::QuitModal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Left | KeyCode::Char('h') => {
                    Some(UserEvent::Swipe(Direction::Left))
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    Some(UserEvent::Swipe(Direction::Right))
                }
                KeyCode::Up | KeyCode::Char('k') => Some(UserEvent::Advance),
                KeyCode::Down | KeyCode::Char('j') => Some(UserEvent::Retreat),
                KeyCode::Char('s') => Some(UserEvent::CycleStyle),
                KeyCode::Char('r') => Some(UserEvent::ReplayEnding),
                KeyCode::Char('f') => Some(UserEvent::RetryFetch),
                _ => None,
            }
        }
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(12),   // card / ending
            Constraint::Length(4), // score
            Constraint::Length(5), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], snap);
    draw_card(f, chunks[1], snap);
    draw_score(f, chunks[2], snap);
    draw_status(f, chunks[3], snap);
    draw_help(f, chunks[4], snap);
    draw_modals(f, state, snap);
}

fn draw_header(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let player = match &snap.display_name {
        Some(name) => format!("Player: {name}"),
        None => String::from("Player: anonymous"),
    };
    let position = match snap.phase {
        SessionPhase::Completed => String::from("Dex complete"),
        SessionPhase::Active => {
            format!("Pokemon {} of {}", snap.current_id, DEX_END)
        }
    };
    let line = Line::from(vec![
        Span::styled(
            "Poké",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "SMASH",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " | {} | {} | style: {}",
            position,
            player,
            snap.style.as_str()
        )),
    ]);
    let widget = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn draw_card(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    if snap.phase == SessionPhase::Completed {
        draw_ending(f, area, snap);
        return;
    }
    if let Some(fault) = &snap.fault {
        let widget = Paragraph::new(vec![
            Line::from(fault.clone()),
            Line::from(""),
            Line::from("Press f to retry"),
        ])
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("Trouble"));
        f.render_widget(widget, area);
        return;
    }
    let Some(pokemon) = &snap.pokemon else {
        let widget = Paragraph::new("Loading...")
            .block(Block::default().borders(Borders::ALL).title("???"));
        f.render_widget(widget, area);
        return;
    };

    let border_color = pokemon
        .primary_type()
        .map(type_color)
        .unwrap_or(Color::White);
    let mut title = pokemon.display_name();
    if snap.shiny {
        title.push_str(" ✨");
    }

    let mut type_spans: Vec<Span> = Vec::new();
    for kind in &pokemon.types {
        if !type_spans.is_empty() {
            type_spans.push(Span::raw(" "));
        }
        type_spans.push(Span::styled(
            format!(" {} ", kind.name()),
            Style::default()
                .fg(Color::Black)
                .bg(type_color(*kind))
                .add_modifier(Modifier::BOLD),
        ));
    }

    let flavor = snap
        .species
        .as_ref()
        .and_then(|species| species.flavor_text.clone())
        .unwrap_or_else(|| String::from("Succelent, Beautiful."));

    let max_width = area.width.saturating_sub(4) as usize;
    let mut lines = vec![Line::from(type_spans), Line::from("")];
    lines.push(Line::from(flavor));
    lines.push(Line::from(""));
    if let Some(bg) = snap.background {
        lines.push(Line::styled(
            format!("scene: {bg}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(sprite) = pokemon.sprites.for_style(snap.style) {
        lines.push(Line::styled(
            format!("art: {}", fit_width(sprite, max_width.saturating_sub(5))),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let widget = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(widget, area);
}

fn draw_ending(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = vec![
        Line::from(""),
        Line::styled(
            ENDING_TEXT,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
    ];
    if snap.seen_ending {
        lines.push(Line::from("Press r to watch the ending again"));
    }
    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("The End"));
    f.render_widget(widget, area);
}

fn draw_score(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let halves = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let smashes = Paragraph::new(snap.smashes.to_string())
        .style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Smashes"));
    f.render_widget(smashes, halves[0]);

    let passes = Paragraph::new(snap.passes.to_string())
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Passes"));
    f.render_widget(passes, halves[1]);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for e in &snap.errors {
            lines.push(Line::from(e.clone()));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let text = match snap.phase {
        SessionPhase::Completed => "r replay ending | s style | q/Esc quit",
        SessionPhase::Active => {
            "← pass | → smash | ↑/↓ browse | s style | f refetch | q/Esc quit"
        }
    };
    let help =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::Shock { message } => {
            let area = centered_rect(50, 30, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title("!!!");
            let p = Paragraph::new(message.unwrap_or(DEFAULT_SHOCK_TEXT))
                .wrap(Wrap { trim: false })
                .alignment(Alignment::Center)
                .style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                );
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the game? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
    if state.celebrating {
        let area = centered_rect(50, 30, f.area());
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Ending Cutscene");
        let p = Paragraph::new(vec![
            Line::from("✨ The credits roll once more... ✨"),
            Line::from(""),
            Line::from(format!("{} smashed, {} passed.", snap.smashes, snap.passes)),
            Line::from(""),
            Line::from("(press any key)"),
        ])
        .alignment(Alignment::Center);
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}

fn type_color(kind: TypeKind) -> Color {
    match kind {
        TypeKind::Bug => Color::Rgb(166, 185, 26),
        TypeKind::Dark => Color::Rgb(112, 87, 70),
        TypeKind::Dragon => Color::Rgb(111, 53, 252),
        TypeKind::Electric => Color::Rgb(247, 208, 44),
        TypeKind::Fairy => Color::Rgb(214, 133, 173),
        TypeKind::Fighting => Color::Rgb(194, 46, 40),
        TypeKind::Fire => Color::Rgb(238, 129, 48),
        TypeKind::Flying => Color::Rgb(169, 143, 243),
        TypeKind::Ghost => Color::Rgb(115, 87, 151),
        TypeKind::Grass => Color::Rgb(122, 199, 76),
        TypeKind::Ground => Color::Rgb(226, 191, 101),
        TypeKind::Ice => Color::Rgb(150, 217, 214),
        TypeKind::Normal => Color::Rgb(168, 167, 122),
        TypeKind::Poison => Color::Rgb(163, 62, 161),
        TypeKind::Psychic => Color::Rgb(249, 85, 135),
        TypeKind::Rock => Color::Rgb(182, 161, 54),
        TypeKind::Steel => Color::Rgb(183, 183, 206),
        TypeKind::Water => Color::Rgb(99, 144, 240),
    }
}

// Scene categories lifted from the card art set, keyed by the primary type.
fn background_candidates(kind: TypeKind) -> &'static [&'static str] {
    match kind {
        TypeKind::Bug => &["forest"],
        TypeKind::Dark => &["city"],
        TypeKind::Dragon => &["space"],
        TypeKind::Electric => &["thunderplains"],
        TypeKind::Fairy => &["space"],
        TypeKind::Fighting => &["city", "meadow"],
        TypeKind::Fire => &["volcanocave", "desert"],
        TypeKind::Flying => &["mountain", "route"],
        TypeKind::Ghost => &["earthycave"],
        TypeKind::Grass => &["meadow"],
        TypeKind::Ground => &["mountain", "earthycave", "route"],
        TypeKind::Ice => &["icecave"],
        TypeKind::Normal => &["route", "city"],
        TypeKind::Poison => &["earthycave"],
        TypeKind::Psychic => &["city", "spl"],
        TypeKind::Rock => &["mountain", "earthycave"],
        TypeKind::Steel => &["mountain"],
        TypeKind::Water => &["beach", "beachshore", "river", "deepsea"],
    }
}

pub fn pick_background(
    types: &[TypeKind],
    rng: &mut impl Rng,
) -> Option<&'static str> {
    let candidates = background_candidates(*types.first()?);
    candidates
        .get(rng.random_range(0..candidates.len()))
        .copied()
}

fn fit_width(text: &str, max: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > max.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn pick_background__uses_the_primary_type_table() {
        // given
        let mut rng = rand::rng();

        // when
        let bg = pick_background(&[TypeKind::Bug, TypeKind::Flying], &mut rng);

        // then
        assert_eq!(bg, Some("forest"));
    }

    #[test]
    fn pick_background__is_empty_without_type_data() {
        // given
        let mut rng = rand::rng();

        // when / then
        assert_eq!(pick_background(&[], &mut rng), None);
    }

    #[test]
    fn fit_width__truncates_wide_text_with_an_ellipsis() {
        // given
        let url = "https://example.invalid/a/very/long/sprite/path.png";

        // when
        let fitted = fit_width(url, 16);

        // then
        assert!(fitted.ends_with('…'));
        assert!(fitted.chars().count() <= 16);
    }
}
