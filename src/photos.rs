//! Listing photo downloads.

use reqwest::Client;
use tracing::warn;

use crate::comps::ComparableListing;

/// A comparable's header data plus the photo bytes that survived fetching.
#[derive(Debug, Clone)]
pub struct ListingPhotos {
    pub ordinal: usize,
    pub price: Option<String>,
    pub photos: Vec<Vec<u8>>,
}

pub fn build_client() -> Client {
    Client::builder()
        .user_agent("arv-scraper/0.1")
        .build()
        .expect("failed to build http client")
}

/// Downloads each listing's photos in order. An individual failure skips that
/// photo; there are no retries.
pub async fn fetch_listing_photos(
    client: &Client,
    comparables: &[ComparableListing],
) -> Vec<ListingPhotos> {
    let mut fetched = Vec::with_capacity(comparables.len());

    for comp in comparables {
        let mut photos = Vec::new();
        for url in &comp.photo_urls {
            match client.get(url).send().await {
                Ok(res) if res.status().is_success() => match res.bytes().await {
                    Ok(bytes) => photos.push(bytes.to_vec()),
                    Err(e) => {
                        warn!(listing = comp.ordinal, url = %url, error = %e, "failed to read photo body")
                    }
                },
                Ok(res) => {
                    warn!(listing = comp.ordinal, url = %url, status = %res.status(), "photo fetch rejected")
                }
                Err(e) => {
                    warn!(listing = comp.ordinal, url = %url, error = %e, "photo fetch failed")
                }
            }
        }
        fetched.push(ListingPhotos {
            ordinal: comp.ordinal,
            price: comp.price.clone(),
            photos,
        });
    }

    fetched
}
