//! Load Client
//!
//! Generates random product photos and descriptions and posts them to a
//! running price predictor, reporting status codes and latency.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng;
use reqwest::multipart::{Form, Part};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const ADJECTIVES: &[&str] = &[
    "Brand New", "Used", "Vintage", "Refurbished", "Genuine", "Handmade", "Premium", "Compact",
];
const PRODUCTS: &[&str] = &[
    "iPhone 14", "Leather Wallet", "Coffee Maker", "Desk Lamp", "Running Shoes", "Bluetooth Speaker",
    "Office Chair", "Wrist Watch", "Backpack", "Gaming Mouse",
];
const SUFFIXES: &[&str] = &["", "!", " - 256GB", " (like new)", ", free shipping", " 10% off"];

/// One generated upload
struct Sample {
    image: Vec<u8>,
    file_name: &'static str,
    mime: &'static str,
    description: String,
    quantity: String,
}

/// Random product generator
struct SampleGenerator {
    rng: rand::rngs::ThreadRng,
}

impl SampleGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// A well-formed upload the service should price
    fn generate_valid(&mut self) -> anyhow::Result<Sample> {
        let width = self.rng.gen_range(64..640);
        let height = self.rng.gen_range(64..640);
        let base = [self.rng.gen::<u8>(), self.rng.gen::<u8>(), self.rng.gen::<u8>()];
        let noise: u8 = self.rng.gen_range(1..40);

        let mut img = RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            let jitter = self.rng.gen_range(0..noise);
            *pixel = Rgb(base.map(|c| c.saturating_add(jitter)));
        }

        let (format, file_name, mime) = if self.rng.gen_bool(0.5) {
            (ImageFormat::Png, "product.png", "image/png")
        } else {
            (ImageFormat::Jpeg, "product.jpg", "image/jpeg")
        };
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format)?;

        let description = if self.rng.gen_bool(0.2) {
            String::new()
        } else {
            format!(
                "{} {}{}",
                self.random_choice(ADJECTIVES),
                self.random_choice(PRODUCTS),
                self.random_choice(SUFFIXES)
            )
        };

        Ok(Sample {
            image: buf.into_inner(),
            file_name,
            mime,
            description,
            quantity: self.rng.gen_range(1..=20).to_string(),
        })
    }

    /// An upload the service should reject with a 4xx status
    fn generate_invalid(&mut self) -> anyhow::Result<Sample> {
        let mut sample = self.generate_valid()?;
        match self.rng.gen_range(0..3) {
            0 => sample.quantity = self.random_choice(&["0", "-3", "abc", "2.5"]).to_string(),
            1 => {
                sample.image = (0..256).map(|_| self.rng.gen()).collect();
                sample.file_name = "noise.bin";
                sample.mime = "application/octet-stream";
            }
            _ => {
                let cut = sample.image.len() / 3;
                sample.image.truncate(cut);
            }
        }
        Ok(sample)
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Parse a probability argument, clamped to [0, 1]; non-numbers fall back
fn parse_rate(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| !rate.is_nan())
        .map_or(default, |rate| rate.clamp(0.0, 1.0))
}

/// Pull the rendered unit price out of a result page
fn extract_unit_price(page: &str) -> Option<&str> {
    let marker = r#"id="price-per-unit">"#;
    let start = page.find(marker)? + marker.len();
    let end = page[start..].find('<')?;
    Some(&page[start..start + end])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("load_client=info".parse()?),
        )
        .init();

    info!("Starting Load Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("http://localhost:10000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);
    let invalid_rate = parse_rate(args.get(3).map(|s| s.as_str()), 0.1);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        base_url = %base_url,
        count = count,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let url = format!("{}/predict", base_url.trim_end_matches('/'));

    let mut generator = SampleGenerator::new();
    let mut rng = rand::thread_rng();
    let mut statuses: BTreeMap<u16, u64> = BTreeMap::new();
    let mut latencies_ms: Vec<u128> = Vec::with_capacity(count as usize);
    let mut transport_errors = 0u64;

    for i in 0..count {
        let sample = if rng.gen_bool(invalid_rate) {
            generator.generate_invalid()?
        } else {
            generator.generate_valid()?
        };

        let form = Form::new()
            .part(
                "image",
                Part::bytes(sample.image)
                    .file_name(sample.file_name)
                    .mime_str(sample.mime)?,
            )
            .text("quantity", sample.quantity.clone())
            .text("description", sample.description.clone());

        let started = Instant::now();
        match client.post(&url).multipart(form).send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let elapsed = started.elapsed().as_millis();
                latencies_ms.push(elapsed);
                *statuses.entry(status.as_u16()).or_insert(0) += 1;

                debug!(
                    status = status.as_u16(),
                    elapsed_ms = elapsed as u64,
                    quantity = %sample.quantity,
                    description = %sample.description,
                    unit_price = extract_unit_price(&body).unwrap_or("-"),
                    "Request complete"
                );
            }
            Err(e) => {
                transport_errors += 1;
                warn!(error = %e, "Request failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!("Sent {}/{} requests", i + 1, count);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    latencies_ms.sort_unstable();
    let p50 = latencies_ms.get(latencies_ms.len() / 2).copied().unwrap_or(0);
    let p99 = latencies_ms
        .get((latencies_ms.len() as f64 * 0.99) as usize)
        .or(latencies_ms.last())
        .copied()
        .unwrap_or(0);

    info!(
        "Completed! {} requests, {} transport errors, latency p50={}ms p99={}ms",
        count, transport_errors, p50, p99
    );
    for (status, n) in &statuses {
        info!("  HTTP {}: {}", status, n);
    }

    Ok(())
}
