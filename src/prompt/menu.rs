//! The numbered main menu shown when no subcommand is given.

use anyhow::Result;

use super::{InputKind, Prompter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Generate,
    GenerateAndDeploy,
    Clean,
    Quit,
}

/// Numbered entries, in display order.
pub const MENU_ENTRIES: &[(MenuAction, &str)] = &[
    (MenuAction::Generate, "Generate configuration"),
    (MenuAction::GenerateAndDeploy, "Generate and deploy"),
    (MenuAction::Clean, "Clean"),
];

/// Parse one menu answer. `None` means the answer should be asked again.
pub fn parse_menu_selection(input: &str) -> Option<MenuAction> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Some(MenuAction::Quit);
    }
    let number: usize = input.parse().ok()?;
    number
        .checked_sub(1)
        .and_then(|idx| MENU_ENTRIES.get(idx))
        .map(|(action, _)| *action)
}

pub fn render_menu() -> String {
    let mut out = String::new();
    for (idx, (_, label)) in MENU_ENTRIES.iter().enumerate() {
        out.push_str(&format!("  {}) {}\n", idx + 1, label));
    }
    out.push_str("  q) Quit");
    out
}

/// Show the menu and ask until a valid entry is picked.
pub fn select_action(prompter: &mut dyn Prompter) -> Result<MenuAction> {
    prompter.say(&render_menu());
    loop {
        let answer = prompter.ask(
            "Select a number from the above",
            "selection",
            InputKind::FreeText,
            None,
        )?;
        match parse_menu_selection(&answer) {
            Some(action) => return Ok(action),
            None => prompter.say(&format!(
                "'{}' is not a valid selection. Please retry.",
                answer.trim()
            )),
        }
    }
}
