use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tui_input::backend::crossterm::to_input_request;

use crate::app::{App, Mode, Scroll, StreamMode};
use crate::effects::Intent;
use crate::event::Action;
use crate::tui::View;

/// Handle key event and update app state
///
/// Returns the side effect the key asked for, if any.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Option<Intent> {
    // Ctrl-C cancels and quits from any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.request_quit();
        return None;
    }

    match app.mode() {
        Mode::Normal => handle_normal_mode(app, key),
        Mode::Search => {
            handle_search_mode(app, key);
            None
        }
    }
}

/// Handle key event in Normal mode
fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Option<Intent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('b') if !ctrl => app.start(Action::Build),
        KeyCode::Char('r') if !ctrl => app.start(Action::Run),
        KeyCode::Char('t') if !ctrl => app.start(Action::Test),
        KeyCode::Char('x') if !ctrl => app.start(Action::Clean),
        KeyCode::Esc => app.cancel(),
        KeyCode::Char('q') => app.quit(),

        // View switching
        KeyCode::Tab => app.tabs_mut().next_tab(),
        KeyCode::BackTab => app.tabs_mut().prev_tab(),
        KeyCode::Char(c @ '1'..='3') => {
            app.tabs_mut().select_index(c as usize - '1' as usize);
        }

        _ => {
            return match app.view() {
                View::Dashboard => None,
                View::Stream => handle_stream_keys(app, key),
                View::Issues => handle_issues_keys(app, key),
            };
        }
    }
    None
}

/// Scroll keys shared by the stream and issues views
fn scroll_for(key: KeyEvent) -> Option<Scroll> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    Some(match key.code {
        KeyCode::Char('j') | KeyCode::Down => Scroll::Down(1),
        KeyCode::Char('k') | KeyCode::Up => Scroll::Up(1),
        KeyCode::Char('d') if ctrl => Scroll::HalfPageDown,
        KeyCode::Char('u') if ctrl => Scroll::HalfPageUp,
        KeyCode::PageDown => Scroll::PageDown,
        KeyCode::PageUp => Scroll::PageUp,
        KeyCode::Char('g') | KeyCode::Home => Scroll::Top,
        KeyCode::Char('G') | KeyCode::End => Scroll::Bottom,
        _ => return None,
    })
}

fn handle_stream_keys(app: &mut App, key: KeyEvent) -> Option<Intent> {
    if let Some(scroll) = scroll_for(key) {
        app.scroll(scroll);
        return None;
    }

    match key.code {
        KeyCode::Char('v') => app.cycle_stream_mode(),
        KeyCode::Char('e') => app.toggle_errors_only(),
        KeyCode::Char(']') => app.next_error(),
        KeyCode::Char('[') => app.prev_error(),

        // Phase selection and folding
        KeyCode::Char('J') => app.phases_mut().select_next(),
        KeyCode::Char('K') => app.phases_mut().select_prev(),
        KeyCode::Char('o') | KeyCode::Char(' ') if app.stream_mode() != StreamMode::Flat => {
            app.phases_mut().toggle_selected();
        }
        KeyCode::Char('E') => app.phases_mut().expand_all(),
        KeyCode::Char('C') => app.phases_mut().collapse_all(),

        // Gutter overlays
        KeyCode::Char('#') => app.stream_mut().toggle_line_numbers(),
        KeyCode::Char('T') => app.stream_mut().toggle_timestamps(),

        // Search
        KeyCode::Char('/') => app.set_mode(Mode::Search),
        KeyCode::Char('n') => app.next_search_match(),
        KeyCode::Char('N') => app.prev_search_match(),

        KeyCode::Char('y') => return app.copy_line(),
        KeyCode::Char('Y') => return app.copy_visible(),
        _ => {}
    }
    None
}

fn handle_issues_keys(app: &mut App, key: KeyEvent) -> Option<Intent> {
    if let Some(scroll) = scroll_for(key) {
        app.scroll(scroll);
        return None;
    }

    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') => app.issues_mut().toggle_expand(),
        KeyCode::Char('o') => return app.open_selected_issue(false),
        KeyCode::Char('X') => return app.open_selected_issue(true),
        KeyCode::Char('y') => return app.copy_issue(),
        _ => {}
    }
    None
}

/// Handle key event in Search mode
fn handle_search_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Drop the query and return to normal mode
        KeyCode::Esc => {
            app.search_state_mut().clear();
            app.set_mode(Mode::Normal);
        }

        // Keep the query and return to normal mode
        KeyCode::Enter => {
            app.set_mode(Mode::Normal);
            app.jump_to_current_match();
        }

        // Delegate to tui-input for text editing (Emacs-like keybindings)
        _ => {
            if let Some(req) = to_input_request(&Event::Key(key)) {
                app.search_state_mut().handle_input(req);
                let query = app.search_state().query().to_string();
                app.search_phases(&query);
                app.jump_to_current_match();
            }
        }
    }
}
