//! SIGINT/SIGTERM handling

use anyhow::{Context, Result};
use sciharvest_core::CancelToken;

/// First signal: stop dispatching. Second: abandon in-flight items.
/// Third: exit immediately.
pub fn install(token: &CancelToken) -> Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        let token = token.clone();
        // SAFETY: the handler only touches atomics and calls process::exit
        unsafe {
            signal_hook::low_level::register(signal, move || {
                if token.is_aborted() {
                    std::process::exit(130);
                }
                token.escalate();
            })
        }
        .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(())
}
