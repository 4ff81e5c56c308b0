//! Proxy builder
//!
//! Turns a contract descriptor plus the aspects in scope into a [`Weaving`]:
//! one frozen [`AspectChain`] per contract method. Generated proxies index
//! into the weaving by declaration order, so the chain for method `i` is
//! always `weaving.chain(i)`.

use crate::aspect::SharedAspect;
use crate::chain::AspectChain;
use crate::config::WeaveConfig;
use crate::descriptor::{ContractDescriptor, ContractKind, Receiver, Visibility};
use crate::errors::{Result, SynthesisError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_WEAVING_ID: AtomicU64 = AtomicU64::new(1);

/// Aspect attached to one method through the explicit registration table
#[derive(Clone)]
pub struct Attachment {
    /// Method name
    pub method: String,
    /// Attached aspect
    pub aspect: SharedAspect,
}

/// The synthesized wiring for one contract
pub struct Weaving {
    id: u64,
    contract: ContractDescriptor,
    chains: Vec<AspectChain>,
}

impl Weaving {
    /// Identifier unique within the process
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Contract this weaving was synthesized for
    pub fn contract(&self) -> &ContractDescriptor {
        &self.contract
    }

    /// Chain for the method at `index` in declaration order.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range, which only happens if a proxy and
    /// the descriptor it was generated with disagree.
    pub fn chain(&self, index: usize) -> &AspectChain {
        &self.chains[index]
    }

    /// Chain for a method by name
    pub fn chain_for(&self, method: &str) -> Option<&AspectChain> {
        self.chains.iter().find(|c| c.method().name() == method)
    }

    /// All chains in declaration order
    pub fn chains(&self) -> &[AspectChain] {
        &self.chains
    }

    /// Whether no method has any aspect
    pub fn is_unwoven(&self) -> bool {
        self.chains.iter().all(AspectChain::is_empty)
    }
}

impl std::fmt::Debug for Weaving {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Weaving")
            .field("id", &self.id)
            .field("contract", &self.contract.qualified_name())
            .field("chains", &self.chains)
            .finish()
    }
}

/// Synthesizes weavings from descriptors
#[derive(Debug, Clone, Default)]
pub struct ProxyBuilder {
    config: WeaveConfig,
}

impl ProxyBuilder {
    /// Create a builder
    pub fn new(config: WeaveConfig) -> Self {
        Self { config }
    }

    /// Synthesize the weaving for a contract.
    ///
    /// The effective list of each method is its declared aspects, then the
    /// attachments naming it, then `globals`.
    pub fn synthesize(
        &self,
        contract: ContractDescriptor,
        attachments: &[Attachment],
        globals: &[SharedAspect],
    ) -> Result<Weaving> {
        validate(&contract, attachments)?;

        let name: Arc<str> = Arc::from(contract.name());
        let chains: Vec<AspectChain> = contract
            .methods()
            .iter()
            .map(|method| {
                let aspects: Vec<SharedAspect> = method
                    .aspects()
                    .iter()
                    .cloned()
                    .chain(
                        attachments
                            .iter()
                            .filter(|a| a.method == method.name())
                            .map(|a| a.aspect.clone()),
                    )
                    .chain(globals.iter().cloned())
                    .collect();
                AspectChain::new(
                    name.clone(),
                    method.without_aspects(),
                    aspects,
                    self.config.trace_invocations,
                )
            })
            .collect();

        let weaving = Weaving {
            id: NEXT_WEAVING_ID.fetch_add(1, Ordering::Relaxed),
            contract,
            chains,
        };

        debug!(
            contract = %weaving.contract.qualified_name(),
            weaving_id = weaving.id,
            methods = weaving.chains.len(),
            woven_methods = weaving.chains.iter().filter(|c| !c.is_empty()).count(),
            "Synthesized contract weaving"
        );

        Ok(weaving)
    }
}

fn validate(contract: &ContractDescriptor, attachments: &[Attachment]) -> Result<()> {
    let name = contract.name();

    if contract.kind() != ContractKind::Interface {
        return Err(SynthesisError::contract_shape(
            name,
            "an interface was expected, but a concrete type was found",
        ));
    }

    if contract.visibility() != Visibility::Public {
        return Err(SynthesisError::visibility(name));
    }

    let mut seen = HashSet::new();
    for method in contract.methods() {
        if !seen.insert(method.name()) {
            return Err(SynthesisError::contract_shape(
                name,
                format!("method '{}' is declared more than once", method.name()),
            ));
        }
        if method.receiver() == Receiver::Static {
            return Err(SynthesisError::contract_shape(
                name,
                format!("method '{}' has no receiver", method.name()),
            ));
        }
        if method.is_generic() {
            return Err(SynthesisError::contract_shape(
                name,
                format!("method '{}' is generic", method.name()),
            ));
        }
    }

    if let Some(unknown) = attachments.iter().find(|a| !seen.contains(a.method.as_str())) {
        return Err(SynthesisError::unknown_method(name, &unknown.method));
    }

    Ok(())
}
