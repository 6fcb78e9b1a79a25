//! Interactive device selection (§4.7 stage 1). Kept outside the
//! orchestrator per the §9 redesign note: prompting resolves `deviceName`
//! in a pre-pipeline step instead of interleaving with the structured
//! progress stream.

use crate::error::OperatorError;
use dialoguer::Select;

/// Presents `names` (device profile file names) and returns the chosen
/// one. Empty `names` is an `OperatorError` -- there's nothing to select.
pub fn select_device(names: &[String]) -> Result<String, OperatorError> {
    if names.is_empty() {
        return Err(OperatorError { message: "no device profiles found under DeviceConfig/".to_string() });
    }

    let selection = Select::new()
        .with_prompt("Select a device profile")
        .items(names)
        .default(0)
        .interact()
        .map_err(|e| OperatorError { message: format!("device selection failed: {e}") })?;

    Ok(names[selection].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_is_an_operator_error() {
        let err = select_device(&[]).unwrap_err();
        assert!(err.message.contains("no device profiles"));
    }
}
