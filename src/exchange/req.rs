use log::debug;
use reqwest::{header::CONTENT_TYPE, Client};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub base_url: String,
}

impl HttpClient {
    pub async fn post(&self, url_path: &'static str, data: String) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);
        debug!("POST {} {}", full_url, data);

        let response = self
            .client
            .post(full_url)
            .header(CONTENT_TYPE, "application/json")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}
