// SPDX-License-Identifier: MPL-2.0
//! Helpers shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use image_rs::{DynamicImage, Rgba, RgbaImage};
use image_studio::application::cancellation::CancellationToken;
use image_studio::application::port::{
    BackendError, GenerationBackend, ImageRequest, VideoRequest,
};
use image_studio::domain::media::{EncodedImage, ImageKind, VideoHandle};
use image_studio::media::codec;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A tiny placeholder image whose bytes identify it.
pub fn tagged(tag: u8) -> EncodedImage {
    EncodedImage::new(vec![tag; 16], ImageKind::Png, 4, 4)
}

/// A decodable PNG filled with `color`.
pub fn png(width: u32, height: u32, color: [u8; 4]) -> EncodedImage {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    codec::encode_png(&DynamicImage::ImageRgba8(image)).expect("encode test image")
}

/// A decodable PNG built pixel by pixel.
pub fn png_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> EncodedImage {
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba(f(x, y)));
    codec::encode_png(&DynamicImage::ImageRgba8(image)).expect("encode test image")
}

pub fn rgba(image: &EncodedImage) -> RgbaImage {
    codec::decode(image).expect("decode test image").to_rgba8()
}

/// Backend answering successive image calls from a queue.
#[derive(Debug, Default)]
pub struct SequenceBackend {
    answers: Mutex<VecDeque<Vec<EncodedImage>>>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl SequenceBackend {
    pub fn new(answers: impl IntoIterator<Item = Vec<EncodedImage>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl GenerationBackend for SequenceBackend {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<EncodedImage>, BackendError> {
        self.requests.lock().expect("lock").push(request.clone());
        self.answers
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or(BackendError::NoResult)
    }

    async fn generate_video(
        &self,
        _request: &VideoRequest,
        _cancel: &CancellationToken,
    ) -> Result<Option<VideoHandle>, BackendError> {
        Err(BackendError::NoResult)
    }

    async fn enhance_prompt(&self, prompt: &str) -> Result<String, BackendError> {
        Ok(prompt.to_string())
    }

    async fn translate_prompt(&self, prompt: &str) -> Result<String, BackendError> {
        Ok(prompt.to_string())
    }
}
