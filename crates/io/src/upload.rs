use std::collections::BTreeMap;
use std::path::Path;

use concilia_recon::{ReconConfig, ReconError, ReconInput, Role};
use tracing::{debug, warn};

use crate::cache::ParseCache;
use crate::error::FileError;

/// One uploaded file: its name (used for format and role detection) and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub fn read(path: &Path) -> Result<Self, FileError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Role slots for one session. Replacing a slot evicts the old content from
/// the parse cache.
#[derive(Debug, Default)]
pub struct UploadSet {
    slots: BTreeMap<Role, Upload>,
    cache: ParseCache,
}

impl UploadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an upload into a role slot, returning the one it replaced.
    pub fn insert(&mut self, role: Role, upload: Upload) -> Option<Upload> {
        let previous = self.slots.insert(role, upload);
        if let Some(old) = &previous {
            let evicted = self.cache.invalidate(&old.bytes);
            debug!(%role, file = %old.name, evicted, "upload replaced");
        }
        previous
    }

    /// Assign by file name. `None` when no role's patterns match.
    pub fn insert_detected(&mut self, config: &ReconConfig, upload: Upload) -> Option<Role> {
        let role = detect_role(config, &upload.name)?;
        self.insert(role, upload);
        Some(role)
    }

    pub fn get(&self, role: Role) -> Option<&Upload> {
        self.slots.get(&role)
    }

    pub fn missing_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| !self.slots.contains_key(r))
            .collect()
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ParseCache {
        &mut self.cache
    }

    /// Parse every slot (through the cache) into engine input.
    pub fn load(&mut self, config: &ReconConfig) -> Result<ReconInput, ReconError> {
        if let Some(role) = self.missing_roles().first() {
            return Err(ReconError::MissingInput(*role));
        }
        Ok(ReconInput {
            orders: self.parse(config, Role::Orders)?,
            payments: self.parse(config, Role::Payments)?,
            prices: self.parse(config, Role::Prices)?,
        })
    }

    fn parse(&mut self, config: &ReconConfig, role: Role) -> Result<concilia_recon::Table, ReconError> {
        let upload = self.slots.get(&role).ok_or(ReconError::MissingInput(role))?;
        let skip = config.roles.get(role).skip_rows;
        self.cache.get_or_parse(&upload.name, &upload.bytes, skip)
    }
}

/// First role (orders, payments, prices) whose file-name patterns match.
pub fn detect_role(config: &ReconConfig, file_name: &str) -> Option<Role> {
    let matches: Vec<Role> = Role::ALL
        .into_iter()
        .filter(|r| config.roles.get(*r).matches_file(file_name))
        .collect();
    if matches.len() > 1 {
        warn!(file = file_name, roles = ?matches, "file name matches several roles, using the first");
    }
    matches.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marketplace() -> ReconConfig {
        ReconConfig::preset("marketplace").unwrap()
    }

    #[test]
    fn detects_roles_from_file_names() {
        let config = marketplace();
        assert_eq!(detect_role(&config, "Order.all.20240501_20240531.xlsx"), Some(Role::Orders));
        assert_eq!(detect_role(&config, "my_shopeepay_balance.csv"), Some(Role::Payments));
        assert_eq!(detect_role(&config, "Preços.xlsx"), Some(Role::Prices));
        assert_eq!(detect_role(&config, "notes.txt"), None);
    }

    #[test]
    fn load_reports_first_missing_role() {
        let config = marketplace();
        let mut set = UploadSet::new();
        set.insert(Role::Orders, Upload::new("o.csv", b"order_id\n1\n".to_vec()));
        let err = set.load(&config).unwrap_err();
        assert!(matches!(err, ReconError::MissingInput(Role::Payments)));
    }

    #[test]
    fn replacing_an_upload_invalidates_its_cache_entry() {
        let config = ReconConfig::preset("standard").unwrap();
        let mut set = UploadSet::new();
        set.insert(Role::Orders, Upload::new("orders.csv", b"order_id\n1\n".to_vec()));
        set.insert(Role::Payments, Upload::new("payments.csv", b"order_id,received\n1,5\n".to_vec()));
        set.insert(Role::Prices, Upload::new("prices.csv", b"sku,product_cost\nA,1\n".to_vec()));

        set.load(&config).unwrap();
        assert_eq!(set.cache().len(), 3);

        let old = set
            .insert(Role::Prices, Upload::new("prices.csv", b"sku,product_cost\nA,2\n".to_vec()))
            .unwrap();
        assert_eq!(old.bytes, b"sku,product_cost\nA,1\n");
        assert_eq!(set.cache().len(), 2);

        let input = set.load(&config).unwrap();
        assert_eq!(input.prices.cell(0, 1), "2");
        assert_eq!(set.cache().stats().hits, 2);
    }

    #[test]
    fn read_upload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.all.csv");
        std::fs::write(&path, "a,b\n").unwrap();
        let upload = Upload::read(&path).unwrap();
        assert_eq!(upload.name, "order.all.csv");
        assert_eq!(upload.bytes, b"a,b\n");
    }
}
