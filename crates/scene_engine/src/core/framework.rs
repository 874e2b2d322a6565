//! Framework: owns the scene manager, the settings store and the event pump

use std::fmt;

use thiserror::Error;

use crate::config::{ConfigApi, ConfigError};
use crate::events::EventSystem;
use crate::foundation::logging::{self, info, LevelFilter};
use crate::scene::SceneManager;

use super::config::FrameworkConfig;

/// Framework errors
#[derive(Error, Debug)]
pub enum FrameworkError {
    /// The configuration did not validate
    #[error("Invalid framework configuration: {0}")]
    InvalidConfig(String),

    /// The settings store could not be prepared
    #[error("Config store error: {0}")]
    Config(#[from] ConfigError),
}

/// Top-level object applications create once
pub struct Framework {
    config: FrameworkConfig,
    scenes: SceneManager,
    settings: ConfigApi,
    events: EventSystem,
}

impl fmt::Debug for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framework")
            .field("config", &self.config)
            .field("scenes", &self.scenes.len())
            .field("pending_events", &self.events.pending())
            .finish_non_exhaustive()
    }
}

impl Framework {
    /// Initialise logging, prepare the settings folder and create an empty
    /// scene manager
    pub fn new(config: FrameworkConfig) -> Result<Self, FrameworkError> {
        config.validate().map_err(FrameworkError::InvalidConfig)?;
        logging::init_with_level(logging::parse_level(&config.log_level).unwrap_or(LevelFilter::Info));
        info!("Initializing framework...");

        let mut settings = ConfigApi::new();
        settings.prepare_data_folder(&config.config_folder)?;
        let scenes = SceneManager::new(config.scene.clone());

        Ok(Self {
            config,
            scenes,
            settings,
            events: EventSystem::new(),
        })
    }

    /// Configuration the framework was created with
    pub const fn framework_config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Scene manager
    pub const fn scene(&self) -> &SceneManager {
        &self.scenes
    }

    /// Mutable scene manager
    pub fn scene_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    /// Settings store
    pub const fn config(&self) -> &ConfigApi {
        &self.settings
    }

    /// Mutable settings store
    pub fn config_mut(&mut self) -> &mut ConfigApi {
        &mut self.settings
    }

    /// Event system handlers are registered with
    pub fn events(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Move queued scene events to the event system and dispatch them
    ///
    /// Returns the number of events dispatched.
    pub fn process_events(&mut self) -> usize {
        for scene in self.scenes.scenes_mut() {
            self.events.send_all(scene.drain_events());
        }
        let count = self.events.pending();
        self.events.dispatch();
        count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::events::{SceneEvent, SceneEventHandler, SceneEventType};
    use crate::scene::{AttributeChange, CreateFlags};

    struct Counter(Arc<AtomicUsize>);

    impl SceneEventHandler for Counter {
        fn on_event(&mut self, _event: &SceneEvent) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    fn framework(name: &str) -> Framework {
        let folder = std::env::temp_dir().join(format!("scene_engine_framework_{}_{name}", std::process::id()));
        Framework::new(FrameworkConfig::new().with_config_folder(folder.to_string_lossy())).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Framework::new(FrameworkConfig::new().with_log_level("chatty"));
        assert!(matches!(result, Err(FrameworkError::InvalidConfig(_))));
    }

    #[test]
    fn test_process_events_pumps_every_scene() {
        let mut framework = framework("pump");
        let created = Arc::new(AtomicUsize::new(0));
        framework
            .events()
            .register_handler(SceneEventType::EntityCreated, Box::new(Counter(created.clone())));

        framework.scene_mut().create_scene("a", false, true);
        framework.scene_mut().create_scene("b", false, true);
        for name in ["a", "b"] {
            let scene = framework.scene_mut().scene_mut(name).unwrap();
            scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
            scene.create_entity(0, &[], AttributeChange::Disconnected, CreateFlags::default()).unwrap();
        }

        assert_eq!(framework.process_events(), 2);
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(framework.process_events(), 0);
    }

    #[test]
    fn test_settings_store_is_prepared() {
        let mut framework = framework("settings");
        assert!(framework.config().data_folder().is_some());
        framework.config_mut().write("framework", "client", "name", "tester").unwrap();
        let name = framework
            .config_mut()
            .read("framework", "client", "name", crate::foundation::Variant::Empty)
            .unwrap();
        assert_eq!(name.as_str(), Some("tester"));
        if let Some(folder) = framework.config().data_folder() {
            let _ = std::fs::remove_dir_all(folder);
        }
    }
}
