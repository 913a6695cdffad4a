//! Application state: where things live and how the desk is opened

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{info, warn};
use venue_core::{BookingDesk, Database, Error, Result, Storage, VenueConfig};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "VENUE_CONFIG";

/// Main application state
pub struct AppState {
    data_dir: PathBuf,
    config_path: PathBuf,
    config: VenueConfig,
    admin_token: String,
}

impl AppState {
    /// Resolve paths, load the config, settle the admin token
    pub fn new(config_arg: Option<PathBuf>) -> Result<Self> {
        let data_dir = Self::data_path()?;
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let config_path = resolve_config_path(config_arg, env, &data_dir);
        Self::with_paths(data_dir, config_path)
    }

    pub fn with_paths(data_dir: PathBuf, config_path: PathBuf) -> Result<Self> {
        let config = VenueConfig::load(&config_path)?;

        let (admin_token, generated) = config.admin_token_or_generate();
        if generated {
            warn!(token = %admin_token, "No admin token configured, generated one for this run");
        }

        info!(
            config = %config_path.display(),
            data_dir = %data_dir.display(),
            "Configuration loaded"
        );

        Ok(Self {
            data_dir,
            config_path,
            config,
            admin_token,
        })
    }

    fn data_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "onyx", "venue").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.config.server.bind.parse().map_err(|_| {
            Error::Validation(format!(
                "server.bind '{}' is not an IP address",
                self.config.server.bind
            ))
        })?;
        Ok(SocketAddr::new(ip, self.config.server.port))
    }

    /// Open (or create) the database and seed configured resources
    pub fn open_desk(&self) -> Result<BookingDesk<Database>> {
        let db_path = self.config.database_path(&self.data_dir);

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        let desk = BookingDesk::new(db, self.config.booking.clone());

        let added = seed_resources(&desk, &self.config)?;
        info!(path = %db_path.display(), seeded = added, "Database ready");
        Ok(desk)
    }
}

/// Command-line argument first, then the environment, then the data directory
pub fn resolve_config_path(
    arg: Option<PathBuf>,
    env: Option<PathBuf>,
    data_dir: &Path,
) -> PathBuf {
    arg.or(env).unwrap_or_else(|| data_dir.join("venue.toml"))
}

/// Add configured fields and halls that do not exist yet (matched by name).
/// Returns how many were added.
pub fn seed_resources<S: Storage>(desk: &BookingDesk<S>, config: &VenueConfig) -> Result<usize> {
    let mut added = 0;

    for seed in &config.fields {
        if desk.store().find_field_by_name(seed.name.trim())?.is_none() {
            desk.add_field(&seed.name, seed.surface.clone())?;
            added += 1;
        }
    }

    for seed in &config.halls {
        if desk.store().find_hall_by_name(seed.name.trim())?.is_none() {
            desk.add_hall(&seed.name, seed.capacity)?;
            added += 1;
        }
    }

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
[server]
bind = "127.0.0.1"
port = 7400

[admin]
token = "front-desk"

[[fields]]
name = "Field A"
surface = "synthetic"

[[fields]]
name = "Field B"

[[halls]]
name = "Garden Hall"
capacity = 150
"#;

    #[test]
    fn test_config_path_precedence() {
        let data = Path::new("/data");
        let arg = Some(PathBuf::from("/etc/venue.toml"));
        let env = Some(PathBuf::from("/env/venue.toml"));

        assert_eq!(
            resolve_config_path(arg.clone(), env.clone(), data),
            PathBuf::from("/etc/venue.toml")
        );
        assert_eq!(
            resolve_config_path(None, env, data),
            PathBuf::from("/env/venue.toml")
        );
        assert_eq!(
            resolve_config_path(None, None, data),
            PathBuf::from("/data/venue.toml")
        );
    }

    #[test]
    fn test_open_desk_seeds_once() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("venue.toml");
        std::fs::write(&config_path, CONFIG).unwrap();

        let state = AppState::with_paths(dir.path().join("data"), config_path).unwrap();
        assert_eq!(state.admin_token(), "front-desk");
        assert_eq!(state.bind_addr().unwrap(), "127.0.0.1:7400".parse().unwrap());

        {
            let desk = state.open_desk().unwrap();
            assert_eq!(desk.list_fields(false).unwrap().len(), 2);
            assert_eq!(desk.list_halls(false).unwrap().len(), 1);
        }

        // Reopening finds the seeds by name and adds nothing
        let desk = state.open_desk().unwrap();
        assert_eq!(seed_resources(&desk, &state.config).unwrap(), 0);
        assert_eq!(desk.list_fields(false).unwrap().len(), 2);
        assert!(dir.path().join("data").join("venue.db").exists());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let state =
            AppState::with_paths(dir.path().to_path_buf(), dir.path().join("absent.toml")).unwrap();

        // Generated token: 32 random bytes, URL-safe base64
        assert_eq!(state.admin_token().len(), 43);
        assert_eq!(state.bind_addr().unwrap().port(), venue_core::config::DEFAULT_PORT);
    }

    #[test]
    fn test_bad_bind_address() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("venue.toml");
        std::fs::write(&config_path, "[server]\nbind = \"everywhere\"\n").unwrap();

        let state = AppState::with_paths(dir.path().to_path_buf(), config_path).unwrap();
        assert!(matches!(state.bind_addr(), Err(Error::Validation(_))));
    }
}
