use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    NextRecord,
    PrevRecord,
    CursorDown,
    CursorUp,
    FocusAnswer,
    SwitchPanel,
    NextImage,
    PrevImage,
    OpenImage,
    Reload,
    ResizeLeftShrink,
    ResizeLeftExpand,
}

pub fn action_from_str(s: &str) -> Option<KeyAction> {
    use KeyAction::*;
    Some(match s {
        "next" | "next_record" => NextRecord,
        "prev" | "prev_record" => PrevRecord,
        "down" => CursorDown,
        "up" => CursorUp,
        "answer" | "focus_answer" => FocusAnswer,
        "switch_panel" => SwitchPanel,
        "next_image" => NextImage,
        "prev_image" => PrevImage,
        "open_image" => OpenImage,
        "reload" => Reload,
        "shrink_left" => ResizeLeftShrink,
        "expand_left" => ResizeLeftExpand,
        _ => return None,
    })
}

pub fn default_keymap() -> HashMap<char, KeyAction> {
    use KeyAction::*;
    let mut m = HashMap::new();
    m.insert('n', NextRecord);
    m.insert('p', PrevRecord);
    m.insert('j', CursorDown);
    m.insert('k', CursorUp);
    m.insert('a', FocusAnswer);
    m.insert(']', NextImage);
    m.insert('[', PrevImage);
    m.insert('o', OpenImage);
    m.insert('R', Reload);
    m.insert('<', ResizeLeftShrink);
    m.insert('>', ResizeLeftExpand);
    m
}

/// Single-character keys only; unknown actions are skipped. User bindings
/// override the defaults one key at a time.
pub fn parse_keymap(map: &HashMap<String, String>) -> HashMap<char, KeyAction> {
    let mut out = default_keymap();
    for (k, v) in map {
        let mut chars = k.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            tracing::warn!(key = %k, "ignoring multi-character key binding");
            continue;
        };
        if ch == 'q' {
            tracing::warn!("'q' is reserved for quit");
            continue;
        }
        match action_from_str(v) {
            Some(act) => {
                out.insert(ch, act);
            }
            None => tracing::warn!(action = %v, "unknown key action"),
        }
    }
    out
}
