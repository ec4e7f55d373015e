//! RAII terminal lifecycle guard.
//!
//! [`TerminalGuard`] enters raw mode and the alternate screen on construction,
//! and restores the terminal on [`Drop`], including during panics and early
//! error returns. A panic hook restores the terminal *before* the panic message
//! is printed, so the message lands on a normal screen.

use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};

/// Set while raw mode is on. The panic hook and `Drop` race to restore; only
/// the first one does the work.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Holds the terminal in dashboard mode for its lifetime.
pub struct TerminalGuard {
    hook_installed: bool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, installing a panic-safe cleanup hook.
    ///
    /// # Errors
    /// Returns I/O errors if terminal setup fails. Anything already switched on
    /// is switched back off before returning.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);

        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            restore_terminal_best_effort();
            return Err(e);
        }

        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal_best_effort();
            prev(info);
        }));

        Ok(Self {
            hook_installed: true,
        })
    }

    /// Terminal dimensions (columns, rows), falling back to 80x24.
    #[must_use]
    pub fn terminal_size() -> (u16, u16) {
        terminal::size()
            .ok()
            .filter(|&(c, r)| c > 0 && r > 0)
            .unwrap_or((80, 24))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal_best_effort();
        if self.hook_installed {
            // The previous hook was moved into ours; fall back to the default.
            let _ = panic::take_hook();
        }
    }
}

/// Leave the alternate screen, show the cursor, and disable raw mode.
/// Safe to call any number of times.
fn restore_terminal_best_effort() {
    if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, Show);
        let _ = terminal::disable_raw_mode();
        let _ = stdout.flush();
    }
}
