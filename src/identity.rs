use rand::Rng;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::{Result, anyhow};

/// Persisted client identifier. One file holding the opaque user id, reused
/// across sessions until the backend issues a replacement on registration.
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(Self {
            path: config_dir.join("tavid").join("user_id"),
        })
    }

    #[cfg(test)]
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the stored identifier, or generate and persist a fresh one.
    pub fn load_or_create(&self) -> Result<String> {
        if let Ok(stored) = fs::read_to_string(&self.path) {
            let stored = stored.trim();
            if !stored.is_empty() {
                return Ok(stored.to_string());
            }
        }

        let id = generate_client_id();
        self.save(&id)?;
        Ok(id)
    }

    pub fn save(&self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, id)?;
        Ok(())
    }
}

/// Collision-resistant opaque token: current millis in base 36 plus a random
/// alphanumeric suffix. Deliberately not cryptographic; this is a correlation
/// token, not a credential.
pub fn generate_client_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    let mut rng = rand::thread_rng();
    let suffix: String = (0..10)
        .map(|_| {
            let c = rng.sample(rand::distributions::Alphanumeric) as char;
            c.to_ascii_lowercase()
        })
        .collect();

    format!("{}{}", to_base36(millis), suffix)
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
