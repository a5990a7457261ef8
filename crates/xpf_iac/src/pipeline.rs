//! The generation pipeline: validate, look up policy, render, assemble.

use tracing::{info, warn};
use xpf_policy::policy_for;
use xpf_spec::{DescriptorValidator, RawRequest, ResourceDescriptor};

use crate::assembler::{ManifestAssembler, ManifestSet};
use crate::engines::engine_for;
use crate::error::IacResult;

/// Run one request through the whole pipeline.
pub fn generate(raw: &RawRequest) -> IacResult<ManifestSet> {
    let descriptor = DescriptorValidator::validate(raw)?;
    generate_descriptor(&descriptor)
}

/// Generate from an already validated descriptor.
pub fn generate_descriptor(descriptor: &ResourceDescriptor) -> IacResult<ManifestSet> {
    let policy = policy_for(descriptor.environment());
    let engine = engine_for(descriptor.kind());
    let documents = engine.generate(descriptor, policy)?;
    let set = ManifestAssembler::assemble(descriptor, documents)?;
    info!(
        "Generated {} manifests for {} '{}' ({})",
        set.len(),
        descriptor.kind(),
        descriptor.name(),
        descriptor.environment()
    );
    Ok(set)
}

/// Run each request in isolation; one result per request, in input order.
pub fn generate_batch(raws: &[RawRequest]) -> Vec<IacResult<ManifestSet>> {
    raws.iter()
        .enumerate()
        .map(|(index, raw)| {
            let result = generate(raw);
            if let Err(e) = &result {
                warn!("Request {} failed ({}): {}", index + 1, e.kind(), e);
            }
            result
        })
        .collect()
}
