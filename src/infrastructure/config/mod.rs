use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";
const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";
const AZURE_LOGIN_HOST: &str = "https://login.microsoftonline.com";
const GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(String),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("incomplete configuration: {0}")]
    Incomplete(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    pub debug: bool,
    pub salesforce: SalesforceConfig,
    /// `None` when no Azure AD variables are set: the sign-in gate is off.
    pub azure: Option<AzureConfig>,
    pub tokens: TokenConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct SalesforceConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    /// Base URL for the authorize, token, userinfo and SOAP login endpoints.
    pub login_url: String,
    pub scopes: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security_token: Option<String>,
    pub api_version: String,
    pub token_lifetime_secs: i64,
    pub closed_won_stage: String,
    pub sales_department: String,
    pub meeting_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub username: String,
    pub password: String,
    pub security_token: String,
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub client_id: String,
    pub tenant_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authority: String,
    pub scopes: Vec<String>,
    pub graph_url: String,
    pub allowed_domains: Vec<String>,
    pub allowed_emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub dir: PathBuf,
    pub app_key: String,
    pub refresh_skew_secs: i64,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub avg_deal_size: Decimal,
    pub win_rate: Decimal,
    pub default_coverage_ratio: Decimal,
    pub clamp_remaining: bool,
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let config = Config {
            host: vars.or("HOST", "127.0.0.1"),
            port: vars.parse_or("PORT", 8501)?,
            environment: match vars.or("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match vars.or("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            debug: vars.flag("DEBUG")?,
            salesforce: SalesforceConfig::from_vars(&vars)?,
            azure: AzureConfig::from_vars(&vars)?,
            tokens: TokenConfig {
                dir: vars
                    .get("TOKEN_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_token_dir),
                app_key: vars.or("TOKEN_APP_KEY", "ae_dashboard"),
                refresh_skew_secs: vars.parse_or("TOKEN_REFRESH_SKEW_SECS", 60)?,
            },
            dashboard: DashboardConfig::from_vars(&vars)?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl SalesforceConfig {
    fn from_vars(vars: &Vars) -> Result<Self, ConfigError> {
        let sandbox = vars.flag("SALESFORCE_SANDBOX")?;
        let login_url = match vars
            .get("SALESFORCE_LOGIN_URL")
            .or_else(|| vars.get("SALESFORCE_DOMAIN"))
        {
            Some(custom) => normalize_base_url(&custom),
            None if sandbox => SANDBOX_LOGIN_URL.to_string(),
            None => PRODUCTION_LOGIN_URL.to_string(),
        };

        let config = SalesforceConfig {
            client_id: vars
                .get("SALESFORCE_CLIENT_ID")
                .or_else(|| vars.get("SALESFORCE_CONSUMER_KEY")),
            client_secret: vars
                .get("SALESFORCE_CLIENT_SECRET")
                .or_else(|| vars.get("SALESFORCE_CONSUMER_SECRET")),
            redirect_uri: vars.or(
                "SALESFORCE_REDIRECT_URI",
                "http://localhost:8501/auth/salesforce/callback",
            ),
            login_url,
            scopes: split_words(&vars.or("SALESFORCE_OAUTH_SCOPES", "api refresh_token offline_access")),
            username: vars.get("SALESFORCE_USERNAME"),
            password: vars.get("SALESFORCE_PASSWORD"),
            security_token: vars.get("SALESFORCE_SECURITY_TOKEN"),
            api_version: vars.or("SALESFORCE_API_VERSION", "59.0"),
            token_lifetime_secs: vars.parse_or("SALESFORCE_TOKEN_LIFETIME_SECS", 7200)?,
            closed_won_stage: vars.or("SALESFORCE_CLOSED_WON_STAGE", "Closed/Won"),
            sales_department: vars.or("SALESFORCE_SALES_DEPARTMENT", "Sales"),
            meeting_keywords: split_list(&vars.or("SALESFORCE_MEETING_KEYWORDS", "meeting,call,demo")),
        };

        if !config.oauth_configured() && config.password_credentials().is_none() {
            return Err(ConfigError::Missing(
                "SALESFORCE_CLIENT_ID and SALESFORCE_CLIENT_SECRET (or SALESFORCE_USERNAME, \
                 SALESFORCE_PASSWORD and SALESFORCE_SECURITY_TOKEN)"
                    .to_string(),
            ));
        }

        Ok(config)
    }

    pub fn oauth_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    pub fn password_credentials(&self) -> Option<PasswordCredentials> {
        Some(PasswordCredentials {
            username: self.username.clone()?,
            password: self.password.clone()?,
            security_token: self.security_token.clone()?,
        })
    }
}

impl AzureConfig {
    fn from_vars(vars: &Vars) -> Result<Option<Self>, ConfigError> {
        let client_id = vars.get("AZURE_CLIENT_ID");
        let tenant_id = vars.get("AZURE_TENANT_ID");
        let client_secret = vars.get("AZURE_CLIENT_SECRET");

        let (client_id, tenant_id, client_secret) = match (client_id, tenant_id, client_secret) {
            (None, None, None) => return Ok(None),
            (Some(id), Some(tenant), Some(secret)) => (id, tenant, secret),
            _ => {
                return Err(ConfigError::Incomplete(
                    "AZURE_CLIENT_ID, AZURE_TENANT_ID and AZURE_CLIENT_SECRET must be set together"
                        .to_string(),
                ))
            }
        };

        let authority = vars
            .get("AZURE_AUTHORITY")
            .map(|a| normalize_base_url(&a))
            .unwrap_or_else(|| format!("{}/{}", AZURE_LOGIN_HOST, tenant_id));

        Ok(Some(AzureConfig {
            client_id,
            tenant_id,
            client_secret,
            redirect_uri: vars.or("AZURE_REDIRECT_URI", "http://localhost:8501/auth/azure/callback"),
            authority,
            scopes: split_words(&vars.or("AZURE_SCOPES", "User.Read")),
            graph_url: normalize_base_url(&vars.or("AZURE_GRAPH_URL", GRAPH_URL)),
            allowed_domains: vars.get("AZURE_ALLOWED_DOMAINS").map(|v| split_list(&v)).unwrap_or_default(),
            allowed_emails: vars.get("AZURE_ALLOWED_EMAILS").map(|v| split_list(&v)).unwrap_or_default(),
        }))
    }
}

impl DashboardConfig {
    fn from_vars(vars: &Vars) -> Result<Self, ConfigError> {
        let config = DashboardConfig {
            avg_deal_size: vars.parse_or("DASHBOARD_AVG_DEAL_SIZE", Decimal::new(5000, 0))?,
            win_rate: vars.parse_or("DASHBOARD_WIN_RATE", Decimal::new(20, 2))?,
            default_coverage_ratio: vars
                .parse_or("DASHBOARD_DEFAULT_COVERAGE_RATIO", Decimal::new(50, 1))?,
            clamp_remaining: vars.flag("DASHBOARD_CLAMP_REMAINING")?,
            cache_ttl_secs: vars.parse_or("DASHBOARD_CACHE_TTL_SECS", 300)?,
        };

        if config.avg_deal_size <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "DASHBOARD_AVG_DEAL_SIZE".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if config.win_rate <= Decimal::ZERO || config.win_rate > Decimal::ONE {
            return Err(ConfigError::Invalid {
                key: "DASHBOARD_WIN_RATE".to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }

        Ok(config)
    }
}

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                reason: format!("{:?}: {}", raw, e),
            }),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.to_lowercase()) {
            None => Ok(false),
            Some(v) if ["true", "1", "yes"].contains(&v.as_str()) => Ok(true),
            Some(v) if ["false", "0", "no"].contains(&v.as_str()) => Ok(false),
            Some(v) => Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: format!("{:?} is not a boolean", v),
            }),
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn split_words(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_token_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".salesforce_tokens"))
        .unwrap_or_else(|| PathBuf::from(".salesforce_tokens"))
}
