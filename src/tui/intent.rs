use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::config::KeyConfig;
use crate::model::issue::MAX_PRIORITY;
use crate::tui::editor::EditField;

/// Error type for key bindings in config.toml
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("empty key binding")]
    Empty,
    #[error("unknown key `{0}`")]
    Unknown(String),
    #[error("{name} must be a single character, got `{spec}`")]
    NotAChar { name: &'static str, spec: String },
}

/// A bindable key: a character, `ctrl+<char>`, or one of a few named keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    Char(char),
    Ctrl(char),
    Esc,
    Enter,
    Tab,
    Backspace,
}

impl FromStr for KeySpec {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeySpec::Char(c));
        }
        let lower = s.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("ctrl+") {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(KeySpec::Ctrl(c)),
                _ => Err(KeyParseError::Unknown(s.to_string())),
            };
        }
        match lower.as_str() {
            "esc" | "escape" => Ok(KeySpec::Esc),
            "enter" | "return" => Ok(KeySpec::Enter),
            "tab" => Ok(KeySpec::Tab),
            "backspace" => Ok(KeySpec::Backspace),
            "space" => Ok(KeySpec::Char(' ')),
            _ => Err(KeyParseError::Unknown(s.to_string())),
        }
    }
}

impl KeySpec {
    pub fn matches(self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match (self, key.code) {
            (KeySpec::Char(c), KeyCode::Char(k)) => c == k && !ctrl && !alt,
            (KeySpec::Ctrl(c), KeyCode::Char(k)) => ctrl && c.eq_ignore_ascii_case(&k),
            (KeySpec::Esc, KeyCode::Esc) => true,
            (KeySpec::Enter, KeyCode::Enter) => true,
            (KeySpec::Tab, KeyCode::Tab) => true,
            (KeySpec::Backspace, KeyCode::Backspace) => true,
            _ => false,
        }
    }

    /// Short label for the footer hints
    pub fn label(self) -> String {
        match self {
            KeySpec::Char(' ') => "space".to_string(),
            KeySpec::Char(c) => c.to_string(),
            KeySpec::Ctrl(c) => format!("ctrl+{}", c),
            KeySpec::Esc => "esc".to_string(),
            KeySpec::Enter => "enter".to_string(),
            KeySpec::Tab => "tab".to_string(),
            KeySpec::Backspace => "backspace".to_string(),
        }
    }
}

/// Resolved key bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    pub cancel: KeySpec,
    pub start_search: KeySpec,
    pub edit: KeySpec,
    pub scroll_down: char,
    pub scroll_up: char,
    pub priority_hotkeys: bool,
    pub search: bool,
}

impl Keymap {
    pub fn from_config(keys: &KeyConfig) -> Result<Self, KeyParseError> {
        Ok(Keymap {
            cancel: keys.cancel.parse()?,
            start_search: keys.start_search.parse()?,
            edit: keys.edit.parse()?,
            scroll_down: single_char("scroll_down", &keys.scroll_down)?,
            scroll_up: single_char("scroll_up", &keys.scroll_up)?,
            priority_hotkeys: keys.priority_hotkeys,
            search: keys.search,
        })
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap {
            cancel: KeySpec::Esc,
            start_search: KeySpec::Char('/'),
            edit: KeySpec::Char('e'),
            scroll_down: 'J',
            scroll_up: 'K',
            priority_hotkeys: true,
            search: true,
        }
    }
}

fn single_char(name: &'static str, spec: &str) -> Result<char, KeyParseError> {
    let mut chars = spec.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(KeyParseError::NotAChar {
            name,
            spec: spec.to_string(),
        }),
    }
}

/// The slice of session state that key resolution depends on
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub keymap: &'a Keymap,
    pub searching: bool,
}

/// What a keystroke means, independent of what it does to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Cancel,
    ApplySearch,
    DeleteSearchChar,
    AppendSearchChar(char),
    StartSearch,
    MoveSelection(i32),
    Work,
    Edit,
    ToggleStatus,
    SetPriority(u8),
    ScrollDescription(i32),
    Refresh,
    /// Not ours: hand the raw key to list navigation
    Delegate,
}

/// Shift+letter arrives from some terminals as a lowercase char with SHIFT set
pub fn normalize_key(mut key: KeyEvent) -> KeyEvent {
    if let KeyCode::Char(c) = key.code
        && key.modifiers.contains(KeyModifiers::SHIFT)
        && c.is_ascii_lowercase()
    {
        key.code = KeyCode::Char(c.to_ascii_uppercase());
    }
    key
}

fn plain_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(c)
        }
        _ => None,
    }
}

/// Map a key to an intent. First matching rule wins; the order is load-bearing.
pub fn resolve(key: &KeyEvent, ctx: &KeyContext<'_>) -> Intent {
    let keys = ctx.keymap;
    let ch = plain_char(key);

    if keys.cancel.matches(key) {
        return Intent::Cancel;
    }

    if ctx.searching {
        return match (key.code, ch) {
            (KeyCode::Enter, _) => Intent::ApplySearch,
            (KeyCode::Backspace, _) => Intent::DeleteSearchChar,
            (_, Some(c)) if (' '..='~').contains(&c) => Intent::AppendSearchChar(c),
            _ => Intent::Delegate,
        };
    }

    if keys.search && keys.start_search.matches(key) {
        return Intent::StartSearch;
    }

    match ch {
        Some('j') => return Intent::MoveSelection(1),
        Some('k') => return Intent::MoveSelection(-1),
        _ => {}
    }

    // In the field editor the commit key submits; `resolve_edit` owns that
    if key.code == KeyCode::Enter {
        return Intent::Work;
    }

    if keys.edit.matches(key) {
        return Intent::Edit;
    }

    let Some(c) = ch else {
        return Intent::Delegate;
    };

    if c == ' ' {
        return Intent::ToggleStatus;
    }

    if keys.priority_hotkeys
        && let Some(d) = c.to_digit(10)
        && d <= u32::from(MAX_PRIORITY)
    {
        return Intent::SetPriority(d as u8);
    }

    if c == keys.scroll_down {
        return Intent::ScrollDescription(1);
    }
    if c == keys.scroll_up {
        return Intent::ScrollDescription(-1);
    }

    if c == 'r' {
        return Intent::Refresh;
    }

    Intent::Delegate
}

/// What a keystroke means while a field editor has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditIntent {
    Cancel,
    Submit,
    Quit,
    SwitchField,
    InsertNewline,
    Insert(char),
    DeleteBackward,
    MoveHorizontal(i32),
    MoveVertical(i32),
    LineStart,
    LineEnd,
    Ignore,
}

pub fn resolve_edit(key: &KeyEvent, focus: EditField, keymap: &Keymap) -> EditIntent {
    if keymap.cancel.matches(key) {
        return EditIntent::Cancel;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match (key.code, ctrl) {
        (KeyCode::Char('c'), true) => EditIntent::Quit,
        (KeyCode::Char('s'), true) => EditIntent::Submit,
        (KeyCode::Char('a'), true) | (KeyCode::Home, _) => EditIntent::LineStart,
        (KeyCode::Char('e'), true) | (KeyCode::End, _) => EditIntent::LineEnd,
        (KeyCode::Tab | KeyCode::BackTab, _) => EditIntent::SwitchField,
        (KeyCode::Enter, _) => match focus {
            EditField::Title => EditIntent::Submit,
            EditField::Description => EditIntent::InsertNewline,
        },
        (KeyCode::Backspace, _) => EditIntent::DeleteBackward,
        (KeyCode::Left, _) => EditIntent::MoveHorizontal(-1),
        (KeyCode::Right, _) => EditIntent::MoveHorizontal(1),
        (KeyCode::Up, _) => EditIntent::MoveVertical(-1),
        (KeyCode::Down, _) => EditIntent::MoveVertical(1),
        _ => match plain_char(key) {
            Some(c) if !c.is_control() => EditIntent::Insert(c),
            _ => EditIntent::Ignore,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn browse(keymap: &Keymap) -> KeyContext<'_> {
        KeyContext {
            keymap,
            searching: false,
        }
    }

    fn search(keymap: &Keymap) -> KeyContext<'_> {
        KeyContext {
            keymap,
            searching: true,
        }
    }

    #[test]
    fn key_spec_parse() {
        assert_eq!("esc".parse(), Ok(KeySpec::Esc));
        assert_eq!("Enter".parse(), Ok(KeySpec::Enter));
        assert_eq!("/".parse(), Ok(KeySpec::Char('/')));
        assert_eq!("space".parse(), Ok(KeySpec::Char(' ')));
        assert_eq!("ctrl+g".parse(), Ok(KeySpec::Ctrl('g')));
        assert_eq!("".parse::<KeySpec>(), Err(KeyParseError::Empty));
        assert_eq!(
            "hyper+x".parse::<KeySpec>(),
            Err(KeyParseError::Unknown("hyper+x".into()))
        );
    }

    #[test]
    fn key_spec_matches() {
        assert!(KeySpec::Char('e').matches(&ch('e')));
        assert!(!KeySpec::Char('e').matches(&ctrl('e')));
        assert!(KeySpec::Ctrl('g').matches(&ctrl('g')));
        assert!(!KeySpec::Ctrl('g').matches(&ch('g')));
        assert!(KeySpec::Esc.matches(&key(KeyCode::Esc)));
    }

    #[test]
    fn keymap_from_config() {
        let keymap = Keymap::from_config(&KeyConfig::default()).unwrap();
        assert_eq!(keymap, Keymap::default());

        let bad = KeyConfig {
            scroll_down: "pgdn".into(),
            ..KeyConfig::default()
        };
        assert_eq!(
            Keymap::from_config(&bad),
            Err(KeyParseError::NotAChar {
                name: "scroll_down",
                spec: "pgdn".into()
            })
        );
    }

    #[test]
    fn cancel_wins_everywhere() {
        let km = Keymap::default();
        assert_eq!(resolve(&key(KeyCode::Esc), &browse(&km)), Intent::Cancel);
        assert_eq!(resolve(&key(KeyCode::Esc), &search(&km)), Intent::Cancel);
    }

    #[test]
    fn custom_cancel_beats_search_typing() {
        let km = Keymap {
            cancel: KeySpec::Char('q'),
            ..Keymap::default()
        };
        assert_eq!(resolve(&ch('q'), &search(&km)), Intent::Cancel);
    }

    #[test]
    fn search_entry_keys() {
        let km = Keymap::default();
        let ctx = search(&km);
        assert_eq!(resolve(&key(KeyCode::Enter), &ctx), Intent::ApplySearch);
        assert_eq!(resolve(&key(KeyCode::Backspace), &ctx), Intent::DeleteSearchChar);
        assert_eq!(resolve(&ch('j'), &ctx), Intent::AppendSearchChar('j'));
        assert_eq!(resolve(&ch('3'), &ctx), Intent::AppendSearchChar('3'));
        assert_eq!(resolve(&ch(' '), &ctx), Intent::AppendSearchChar(' '));
        assert_eq!(resolve(&ch('/'), &ctx), Intent::AppendSearchChar('/'));
        assert_eq!(resolve(&ch('é'), &ctx), Intent::Delegate);
        assert_eq!(resolve(&key(KeyCode::Down), &ctx), Intent::Delegate);
        assert_eq!(resolve(&ctrl('c'), &ctx), Intent::Delegate);
    }

    #[test]
    fn start_search_only_when_enabled() {
        let mut km = Keymap::default();
        assert_eq!(resolve(&ch('/'), &browse(&km)), Intent::StartSearch);
        km.search = false;
        assert_eq!(resolve(&ch('/'), &browse(&km)), Intent::Delegate);
    }

    #[test]
    fn browse_keys() {
        let km = Keymap::default();
        let ctx = browse(&km);
        assert_eq!(resolve(&ch('j'), &ctx), Intent::MoveSelection(1));
        assert_eq!(resolve(&ch('k'), &ctx), Intent::MoveSelection(-1));
        assert_eq!(resolve(&key(KeyCode::Enter), &ctx), Intent::Work);
        assert_eq!(resolve(&ch('e'), &ctx), Intent::Edit);
        assert_eq!(resolve(&ch(' '), &ctx), Intent::ToggleStatus);
        assert_eq!(resolve(&ch('J'), &ctx), Intent::ScrollDescription(1));
        assert_eq!(resolve(&ch('K'), &ctx), Intent::ScrollDescription(-1));
        assert_eq!(resolve(&ch('r'), &ctx), Intent::Refresh);
        assert_eq!(resolve(&ch('x'), &ctx), Intent::Delegate);
        assert_eq!(resolve(&key(KeyCode::Up), &ctx), Intent::Delegate);
    }

    #[test]
    fn priority_digits() {
        let mut km = Keymap::default();
        for d in 0..=4u8 {
            let c = char::from(b'0' + d);
            assert_eq!(resolve(&ch(c), &browse(&km)), Intent::SetPriority(d));
        }
        assert_eq!(resolve(&ch('5'), &browse(&km)), Intent::Delegate);
        km.priority_hotkeys = false;
        assert_eq!(resolve(&ch('3'), &browse(&km)), Intent::Delegate);
    }

    #[test]
    fn earlier_rules_shadow_later_ones() {
        // A scroll key bound to `j` never scrolls: navigation claims it first
        let km = Keymap {
            scroll_down: 'j',
            ..Keymap::default()
        };
        assert_eq!(resolve(&ch('j'), &browse(&km)), Intent::MoveSelection(1));

        // Same for a digit scroll key while hotkeys are on
        let km = Keymap {
            scroll_up: '2',
            ..Keymap::default()
        };
        assert_eq!(resolve(&ch('2'), &browse(&km)), Intent::SetPriority(2));
    }

    #[test]
    fn shift_letters_normalize() {
        let k = normalize_key(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::SHIFT));
        assert_eq!(k.code, KeyCode::Char('J'));
        let km = Keymap::default();
        assert_eq!(resolve(&k, &browse(&km)), Intent::ScrollDescription(1));
    }

    #[test]
    fn edit_keys() {
        let km = Keymap::default();
        let title = EditField::Title;
        let desc = EditField::Description;
        assert_eq!(resolve_edit(&key(KeyCode::Esc), title, &km), EditIntent::Cancel);
        assert_eq!(resolve_edit(&key(KeyCode::Enter), title, &km), EditIntent::Submit);
        assert_eq!(
            resolve_edit(&key(KeyCode::Enter), desc, &km),
            EditIntent::InsertNewline
        );
        assert_eq!(resolve_edit(&ctrl('s'), desc, &km), EditIntent::Submit);
        assert_eq!(resolve_edit(&ctrl('c'), desc, &km), EditIntent::Quit);
        assert_eq!(resolve_edit(&key(KeyCode::Tab), title, &km), EditIntent::SwitchField);
        assert_eq!(
            resolve_edit(&key(KeyCode::BackTab), desc, &km),
            EditIntent::SwitchField
        );
        assert_eq!(resolve_edit(&ch('e'), title, &km), EditIntent::Insert('e'));
        assert_eq!(resolve_edit(&ch('j'), desc, &km), EditIntent::Insert('j'));
        assert_eq!(resolve_edit(&ch('你'), desc, &km), EditIntent::Insert('你'));
        assert_eq!(resolve_edit(&ctrl('a'), desc, &km), EditIntent::LineStart);
        assert_eq!(resolve_edit(&key(KeyCode::End), desc, &km), EditIntent::LineEnd);
        assert_eq!(
            resolve_edit(&key(KeyCode::Up), desc, &km),
            EditIntent::MoveVertical(-1)
        );
        assert_eq!(
            resolve_edit(&key(KeyCode::Left), desc, &km),
            EditIntent::MoveHorizontal(-1)
        );
        assert_eq!(
            resolve_edit(&key(KeyCode::Backspace), desc, &km),
            EditIntent::DeleteBackward
        );
        assert_eq!(resolve_edit(&key(KeyCode::F(1)), desc, &km), EditIntent::Ignore);
    }
}
