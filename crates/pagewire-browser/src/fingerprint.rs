use pagewire_core::BrowserConfig;
use rand::Rng;

// Common desktop user agents
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

// Common viewport sizes
const VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// Identity the launched browser presents to sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// `None` keeps Chrome's own user agent
    pub user_agent: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Fingerprint {
    /// Fingerprint described by the launch configuration.
    ///
    /// A fixed `user_agent` in the config wins over randomization.
    pub fn from_config(config: &BrowserConfig) -> Self {
        if config.randomize_fingerprint {
            let mut fingerprint = Self::randomized();
            if config.user_agent.is_some() {
                fingerprint.user_agent.clone_from(&config.user_agent);
            }
            return fingerprint;
        }

        Self {
            user_agent: config.user_agent.clone(),
            viewport_width: config.window_width,
            viewport_height: config.window_height,
        }
    }

    /// Generate a randomized desktop fingerprint
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let vp_idx = rng.gen_range(0..VIEWPORTS.len());
        let (width, height) = VIEWPORTS[vp_idx];

        Self {
            user_agent: Some(USER_AGENTS[ua_idx].to_string()),
            viewport_width: width,
            viewport_height: height,
        }
    }
}
