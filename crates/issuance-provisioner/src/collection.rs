// crates/issuance-provisioner/src/collection.rs
// ============================================================================
// Module: Provisioner Collection
// Description: Read-only active set of initialized provisioners.
// Purpose: Initialize once, index by ID and name, then serve concurrent reads.
// Dependencies: (std only)
// ============================================================================

//! ## Overview
//! [`ProvisionerCollection`] is built once from an [`AuthorityConfig`]: every
//! provisioner is decoded, initialized, and indexed. After construction the
//! collection is immutable and is shared across request handlers behind an
//! `Arc`. Initialization and sign authorization are recorded through the
//! configured [`ProvisionerAuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audit::EVENT_PROVISIONER_AUTHORIZE_SIGN;
use crate::audit::EVENT_PROVISIONER_INIT;
use crate::audit::ProvisionerAuditEvent;
use crate::audit::ProvisionerAuditEventParams;
use crate::audit::ProvisionerAuditOutcome;
use crate::audit::ProvisionerAuditSink;
use crate::config::AuthorityConfig;
use crate::config::ConfigError;
use crate::policy::PolicyElement;
use crate::provisioner::InitConfig;
use crate::provisioner::Provisioner;
use crate::provisioner::ProvisionerError;
use crate::provisioner::ProvisionerInterface;

// ============================================================================
// SECTION: Collection
// ============================================================================

/// Initialized provisioners indexed by identifier and name.
///
/// # Invariants
/// - Every member completed `init` successfully.
/// - Identifiers and names are unique within the collection.
pub struct ProvisionerCollection {
    /// Provisioners in configuration order.
    provisioners: Vec<Arc<Provisioner>>,
    /// Position by provisioner identifier.
    by_id: BTreeMap<String, usize>,
    /// Position by provisioner name.
    by_name: BTreeMap<String, usize>,
    /// Audit sink for init and sign events.
    audit: Arc<dyn ProvisionerAuditSink>,
}

impl ProvisionerCollection {
    /// Decodes, initializes, and indexes every provisioner in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the global claims are invalid, an entry
    /// fails to decode or initialize, or an identifier or name repeats.
    pub fn load(
        config: &AuthorityConfig,
        audit: Arc<dyn ProvisionerAuditSink>,
    ) -> Result<Self, ConfigError> {
        let init = config.init_config()?;
        let provisioners = config.provisioners()?;
        Self::from_provisioners(provisioners, &init, audit)
    }

    /// Initializes and indexes uninitialized provisioners.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a provisioner fails to initialize or an
    /// identifier or name repeats.
    pub fn from_provisioners(
        provisioners: Vec<Provisioner>,
        init: &InitConfig,
        audit: Arc<dyn ProvisionerAuditSink>,
    ) -> Result<Self, ConfigError> {
        let mut collection = Self {
            provisioners: Vec::with_capacity(provisioners.len()),
            by_id: BTreeMap::new(),
            by_name: BTreeMap::new(),
            audit,
        };
        for (index, mut provisioner) in provisioners.into_iter().enumerate() {
            let result = provisioner.init(init);
            collection.record(EVENT_PROVISIONER_INIT, &provisioner, result.as_ref().err());
            result.map_err(|source| ConfigError::Provisioner {
                index,
                name: provisioner.name().to_string(),
                source,
            })?;
            collection.insert(provisioner)?;
        }
        Ok(collection)
    }

    /// Returns the provisioner with the given identifier.
    #[must_use]
    pub fn load_by_id(&self, id: &str) -> Option<Arc<Provisioner>> {
        self.by_id.get(id).and_then(|position| self.provisioners.get(*position)).cloned()
    }

    /// Returns the provisioner with the given name.
    #[must_use]
    pub fn load_by_name(&self, name: &str) -> Option<Arc<Provisioner>> {
        self.by_name.get(name).and_then(|position| self.provisioners.get(*position)).cloned()
    }

    /// Returns all provisioners in configuration order.
    #[must_use]
    pub fn list(&self) -> &[Arc<Provisioner>] {
        &self.provisioners
    }

    /// Returns the number of provisioners.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.provisioners.len()
    }

    /// Returns true when the collection holds no provisioners.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.provisioners.is_empty()
    }

    /// Produces the sign policy of the provisioner with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError::NotFound`] for unknown identifiers, or the
    /// provisioner's own authorization error.
    pub fn authorize_sign(
        &self,
        id: &str,
        token: &str,
    ) -> Result<Vec<PolicyElement>, ProvisionerError> {
        let provisioner =
            self.load_by_id(id).ok_or_else(|| ProvisionerError::NotFound(id.to_string()))?;
        let result = provisioner.authorize_sign(token);
        self.record(EVENT_PROVISIONER_AUTHORIZE_SIGN, &provisioner, result.as_ref().err());
        result
    }

    /// Adds an initialized provisioner, rejecting duplicate IDs and names.
    fn insert(&mut self, provisioner: Provisioner) -> Result<(), ConfigError> {
        let id = provisioner.id();
        if self.by_id.contains_key(&id) {
            return Err(ConfigError::Invalid(format!(
                "provisioner with id {id} has already been loaded"
            )));
        }
        let name = provisioner.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ConfigError::Invalid(format!(
                "provisioner with name {name} has already been loaded"
            )));
        }
        let position = self.provisioners.len();
        self.by_id.insert(id, position);
        self.by_name.insert(name, position);
        self.provisioners.push(Arc::new(provisioner));
        Ok(())
    }

    /// Emits an audit event for a provisioner operation.
    fn record(
        &self,
        event: &'static str,
        provisioner: &Provisioner,
        error: Option<&ProvisionerError>,
    ) {
        let outcome = if error.is_some() {
            ProvisionerAuditOutcome::Failure
        } else {
            ProvisionerAuditOutcome::Success
        };
        self.audit.record(&ProvisionerAuditEvent::new(
            event,
            ProvisionerAuditEventParams {
                provisioner_id: provisioner.id(),
                provisioner_type: provisioner.provisioner_type(),
                provisioner_name: provisioner.name().to_string(),
                outcome,
                message: error.map(ToString::to_string),
            },
        ));
    }
}
