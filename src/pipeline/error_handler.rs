use anyhow::Result;
use std::sync::{Arc, Mutex};

/// Return the first fatal error recorded by a worker, if any. Call after joining the workers.
pub fn check_for_first_error(first_error: &Arc<Mutex<Option<String>>>) -> Result<()> {
    let mut slot = first_error
        .lock()
        .map_err(|_| anyhow::anyhow!("scan error slot poisoned"))?;
    if let Some(msg) = slot.take() {
        return Err(anyhow::anyhow!("{}", msg));
    }
    Ok(())
}
