use super::{send_json, ImageProvider};
use crate::error::ProviderError;
use reqwest::blocking::Client;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

pub struct Unsplash {
    client: Client,
    access_key: String,
    base_url: String,
}

impl Unsplash {
    pub fn new(client: Client, access_key: String) -> Unsplash {
        Unsplash {
            client,
            access_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
}

fn first_url(response: SearchResponse) -> Option<String> {
    response.results.into_iter().next().map(|p| p.urls.regular)
}

impl ImageProvider for Unsplash {
    fn cover_image(&self, query: &str) -> Result<Option<String>, ProviderError> {
        let response: SearchResponse = send_json(
            self.client
                .get(&format!("{}/search/photos", self.base_url))
                .header("Authorization", format!("Client-ID {}", self.access_key))
                .query(&[
                    ("query", query),
                    ("per_page", "1"),
                    ("orientation", "landscape"),
                ]),
        )?;
        Ok(first_url(response))
    }
}
