mod settings;

pub use settings::{
    GitHubSettings, NomadSettings, Settings, SubmitterKind, WatchSettings, WebhookSettings,
};
