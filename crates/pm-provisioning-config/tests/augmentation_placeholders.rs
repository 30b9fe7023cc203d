//! Augmentation placeholder tests for pm-provisioning-config.
// pm-provisioning-config/tests/augmentation_placeholders.rs
// =============================================================================
// Module: Augmentation Placeholder Tests
// Description: Validate placeholder config and URL substitution.
// Purpose: Ensure augmentation URLs resolve only from configured values.
// =============================================================================

use pm_provisioning_config::ProvisioningConfig;
use pm_provisioning_core::AugmentationError;
use pm_provisioning_core::AugmentationUrlResolver;

mod common;

use crate::common::TestResult;
use crate::common::assert_invalid;

fn configured() -> Result<ProvisioningConfig, String> {
    ProvisioningConfig::from_toml(
        "[augmentation.placeholders]\nHOST = \"aug.internal\"\nPORT = \"8443\"\n",
    )
    .map_err(|err| err.to_string())
}

#[test]
fn placeholder_names_must_be_identifiers() -> TestResult {
    assert_invalid(
        ProvisioningConfig::from_toml("[augmentation.placeholders]\n\"bad-name\" = \"x\"\n"),
        "augmentation placeholder name bad-name must match",
    )
}

#[test]
fn placeholder_values_are_length_limited() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.augmentation.placeholders.insert("HOST".to_string(), "h".repeat(2_049));
    assert_invalid(config.validate(), "augmentation placeholder HOST value exceeds max length")
}

#[test]
fn resolver_substitutes_every_placeholder() -> TestResult {
    let resolver = configured()?.url_resolver();
    let resolved = resolver
        .resolve_url("https://${HOST}:${PORT}/augment/${HOST}")
        .map_err(|err| err.to_string())?;
    if resolved != "https://aug.internal:8443/augment/aug.internal" {
        return Err(format!("unexpected url {resolved}"));
    }
    Ok(())
}

#[test]
fn resolver_rejects_unknown_placeholder() -> TestResult {
    let resolver = configured()?.url_resolver();
    match resolver.resolve_url("http://${GATEWAY}/x") {
        Err(AugmentationError::UnresolvedPlaceholder {
            placeholder,
            url,
        }) if placeholder == "GATEWAY" && url == "http://${GATEWAY}/x" => Ok(()),
        other => Err(format!("unexpected result {}", describe(&other))),
    }
}

#[test]
fn resolver_rejects_unterminated_placeholder() -> TestResult {
    let resolver = configured()?.url_resolver();
    match resolver.resolve_url("http://${HOST/x") {
        Err(AugmentationError::MalformedPlaceholder(url)) if url == "http://${HOST/x" => Ok(()),
        other => Err(format!("unexpected result {}", describe(&other))),
    }
}

fn describe(result: &Result<String, AugmentationError>) -> String {
    match result {
        Ok(url) => format!("ok {url}"),
        Err(err) => err.to_string(),
    }
}
