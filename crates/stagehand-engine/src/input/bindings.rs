//! Binding file load/save.
//!
//! Line-oriented text, comma separated. `#` comments and blank lines are ignored.
//!
//! ```text
//! A,<action>,<button>,<trigger>,<axis>,<cares_about_modifiers>
//! K,<scancode>,<shift>,<ctrl>,<alt>,<action>
//! P,<button number>,<action>
//! ```
//!
//! An action must be declared by an `A` line before a `K`/`P` line references it.
//! Bad lines are skipped with a warning; the rest of the file still applies.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::actions::{ActionCaps, ActionMapper, BindingError, ModifierRequirement};
use super::types::{Key, MouseButton};

/// Outcome of reading a binding file.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BindingReport {
    pub applied: usize,
    pub skipped: usize,
}

impl ActionMapper {
    /// Applies binding text to this mapper.
    pub fn apply_bindings(&mut self, text: &str) -> BindingReport {
        let mut report = BindingReport::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match self.apply_binding_line(line) {
                Ok(()) => report.applied += 1,
                Err(reason) => {
                    log::warn!("bindings line {}: {reason}; skipped `{line}`", idx + 1);
                    report.skipped += 1;
                }
            }
        }
        report
    }

    /// Serializes declarations and bindings. Reading the result into a fresh mapper
    /// reproduces the same key/button to action relation.
    pub fn bindings_to_string(&self) -> String {
        let mut out = String::new();
        for (name, caps) in self.declared_actions() {
            let _ = writeln!(
                out,
                "A,{name},{},{},{},{}",
                caps.button, caps.trigger, caps.axis, caps.cares_about_modifiers
            );
        }
        for (key, req, action) in self.key_bindings() {
            let req = req.unwrap_or_default();
            let _ = writeln!(
                out,
                "K,{},{},{},{},{action}",
                key.scancode(),
                req.shift,
                req.ctrl,
                req.alt
            );
        }
        for (button, action) in self.pointer_bindings() {
            let _ = writeln!(out, "P,{},{action}", button.number());
        }
        out
    }

    pub fn load_bindings(&mut self, path: impl AsRef<Path>) -> Result<BindingReport, BindingError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BindingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report = self.apply_bindings(&text);
        log::info!(
            "loaded bindings from {} ({} applied, {} skipped)",
            path.display(),
            report.applied,
            report.skipped
        );
        Ok(report)
    }

    pub fn save_bindings(&self, path: impl AsRef<Path>) -> Result<(), BindingError> {
        let path = path.as_ref();
        fs::write(path, self.bindings_to_string()).map_err(|source| BindingError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_binding_line(&mut self, line: &str) -> Result<(), String> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        match fields.as_slice() {
            ["A", name, button, trigger, axis, cares] => {
                let caps = ActionCaps {
                    button: parse_bool(button)?,
                    trigger: parse_bool(trigger)?,
                    axis: parse_bool(axis)?,
                    cares_about_modifiers: parse_bool(cares)?,
                };
                self.declare_action(*name, caps).map_err(|e| e.to_string())
            }
            ["K", code, shift, ctrl, alt, action] => {
                let code: u32 = code.parse().map_err(|_| format!("bad scancode `{code}`"))?;
                let req = ModifierRequirement {
                    shift: parse_bool(shift)?,
                    ctrl: parse_bool(ctrl)?,
                    alt: parse_bool(alt)?,
                };
                self.add_key_action(Key::from_scancode(code), req, action)
                    .map_err(|e| e.to_string())
            }
            ["P", button, action] => {
                let n: u16 = button.parse().map_err(|_| format!("bad pointer button `{button}`"))?;
                self.add_pointer_action(MouseButton::from_number(n), action)
                    .map_err(|e| e.to_string())
            }
            [tag, ..] => Err(format!("unrecognised record `{tag}` with {} fields", fields.len())),
            [] => Err("empty record".into()),
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Ok(false)
    } else {
        Err(format!("bad boolean `{s}`"))
    }
}
