use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    pub upload_dir: String,
    pub s3_endpoint: String,
    pub s3_bucket: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public origin used when building reset links for emails.
    pub base_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".into());

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "credo".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "credo-users".into()),
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(90),
        };

        let driver = match std::env::var("STORAGE_DRIVER").as_deref() {
            Ok("s3") => StorageDriver::S3,
            _ => StorageDriver::Local,
        };
        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads/images".into());
        let storage = match driver {
            StorageDriver::Local => StorageConfig {
                driver,
                upload_dir,
                s3_endpoint: String::new(),
                s3_bucket: String::new(),
                s3_access_key: String::new(),
                s3_secret_key: String::new(),
            },
            // S3 credentials are only required when the driver asks for them.
            StorageDriver::S3 => StorageConfig {
                driver,
                upload_dir,
                s3_endpoint: std::env::var("S3_ENDPOINT")?,
                s3_bucket: std::env::var("S3_BUCKET")?,
                s3_access_key: std::env::var("S3_ACCESS_KEY")?,
                s3_secret_key: std::env::var("S3_SECRET_KEY")?,
            },
        };

        Ok(Self {
            database_url,
            base_url,
            jwt,
            storage,
        })
    }
}
