use anyhow::{Context, anyhow};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::{ListPage, MAX_LIST_KEYS, ObjectEntry, ObjectReader};

/// Client construction options. Anything left unset falls back to the standard AWS
/// environment/profile chain.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Named profile from the shared AWS config/credentials files
    pub profile: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
    /// Use `https://endpoint/bucket/key` instead of virtual-hosted style addressing
    pub force_path_style: bool,
}

impl ClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.endpoint_url {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => Err(
                anyhow!("endpoint url {:?} must start with http:// or https://", url),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Resolve credentials/region and build a client. No request is sent here; credential
    /// problems surface on the first call.
    pub async fn connect(config: &ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &config.region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();
        tracing::debug!(
            "s3 client configured, region: {:?}",
            sdk_config.region().map(ToString::to_string)
        );
        Ok(Self::from_client(aws_sdk_s3::Client::from_conf(s3_config)))
    }

    #[must_use]
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl crate::ObjectStore for S3Store {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> anyhow::Result<ListPage> {
        let max_keys = i32::try_from(MAX_LIST_KEYS).context("page size does not fit in i32")?;
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|err| {
                anyhow!(
                    "failed listing s3://{}/{}: {}",
                    bucket,
                    prefix,
                    DisplayErrorContext(err)
                )
            })?;
        let entries = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectEntry {
                    key: key.to_string(),
                    size: u64::try_from(object.size().unwrap_or_default()).unwrap_or_default(),
                })
            })
            .collect();
        Ok(ListPage {
            entries,
            truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> anyhow::Result<ObjectReader> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await
            .map_err(|err| {
                anyhow!(
                    "failed fetching s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(err)
                )
            })?;
        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: tokio::fs::File,
    ) -> anyhow::Result<()> {
        let body = ByteStream::read_from()
            .file(body)
            .build()
            .await
            .with_context(|| format!("failed preparing body for s3://{bucket}/{key}"))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                anyhow!(
                    "failed uploading s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(err)
                )
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_requires_http_scheme() {
        let config = ClientConfig {
            endpoint_url: Some("localhost:9000".to_string()),
            ..Default::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("must start with http"));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
        let config = ClientConfig {
            endpoint_url: Some("http://127.0.0.1:9000".to_string()),
            force_path_style: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
