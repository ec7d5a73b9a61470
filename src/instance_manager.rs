//! # OCR Instance Manager Module
//!
//! Keeps initialized Tesseract instances around between scans. Loading the
//! Thai traineddata takes a noticeable fraction of a second, so a scan should
//! only pay for it once per engine configuration.

use leptess::LepTess;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ocr_config::{ModelType, OcrConfig};

/// Shared handle to one engine instance. The engine is not reentrant, so
/// recognitions against the same instance are serialized by the mutex.
pub type SharedEngine = Arc<Mutex<LepTess>>;

/// Thread-safe pool of Tesseract instances keyed by engine configuration
///
/// Instances are created on first request for a configuration and reused
/// until removed or the manager is dropped.
pub struct OcrInstanceManager {
    instances: Mutex<HashMap<String, SharedEngine>>,
}

impl OcrInstanceManager {
    /// Create an empty instance pool
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    fn instance_key(config: &OcrConfig) -> String {
        format!(
            "{}:{}:{}",
            config.languages,
            config.model_type.tessdata_dir(),
            config.psm_mode.as_str()
        )
    }

    /// Get or create an OCR instance for the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if Tesseract cannot be initialized, most commonly
    /// because the traineddata for `config.languages` is not installed.
    pub fn get_instance(&self, config: &OcrConfig) -> anyhow::Result<SharedEngine> {
        let key = Self::instance_key(config);

        if let Some(instance) = self.instances.lock().get(&key) {
            return Ok(Arc::clone(instance));
        }

        info!(
            languages = %config.languages,
            model = %config.model_type.tessdata_dir(),
            psm = %config.psm_mode.as_str(),
            "Creating new OCR instance"
        );

        let tessdata_path = Self::get_tessdata_path(config.model_type);

        let mut tess = LepTess::new(tessdata_path.as_deref(), &config.languages)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Tesseract OCR instance: {}", e))?;

        tess.set_variable(
            leptess::Variable::TesseditPagesegMode,
            config.psm_mode.as_str(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to set PSM mode: {}", e))?;

        if let Some(user_words_path) = &config.user_words_file {
            tess.set_variable(leptess::Variable::UserWordsFile, user_words_path)
                .map_err(|e| anyhow::anyhow!("Failed to set user words file: {}", e))?;
            info!(path = %user_words_path, "Configured Tesseract with custom user words file");
        }

        if let Some(whitelist) = &config.character_whitelist {
            tess.set_variable(leptess::Variable::TesseditCharWhitelist, whitelist)
                .map_err(|e| anyhow::anyhow!("Failed to set character whitelist: {}", e))?;
        }

        let instance = Arc::new(Mutex::new(tess));

        // Another scan may have raced us here; keep whichever landed first.
        let mut instances = self.instances.lock();
        let stored = instances.entry(key).or_insert_with(|| Arc::clone(&instance));
        Ok(Arc::clone(stored))
    }

    /// Get an instance that no recognition is currently using.
    ///
    /// A cached instance that is still locked belongs to a call that was
    /// abandoned after a timeout (or to a concurrent scan). It is evicted from
    /// the pool and a fresh engine is created, so the caller never queues
    /// behind a wedged engine. The evicted engine is freed once its call ends.
    pub fn get_idle_instance(&self, config: &OcrConfig) -> anyhow::Result<SharedEngine> {
        let instance = self.get_instance(config)?;
        if !instance.is_locked() {
            return Ok(instance);
        }

        warn!(
            languages = %config.languages,
            "Cached OCR instance is still busy, replacing it"
        );
        self.remove_instance(config);
        self.get_instance(config)
    }

    /// Find the tessdata directory for the model type, if a dedicated one is installed
    fn get_tessdata_path(model_type: ModelType) -> Option<String> {
        let dir = model_type.tessdata_dir();
        let candidates = [
            format!("/usr/share/tesseract-ocr/5/{dir}"),
            format!("/usr/share/tesseract-ocr/4.00/{dir}"),
            format!("/usr/share/{dir}"),
            format!("/usr/local/share/{dir}"),
        ];

        let found = candidates
            .into_iter()
            .find(|path| std::path::Path::new(path).exists());

        match &found {
            Some(path) => info!(path = %path, "Using tessdata path"),
            None => info!(?model_type, "No dedicated tessdata path found, using default"),
        }
        found
    }

    /// Drop the instance for a configuration (e.g. after a corrupted engine state)
    pub fn remove_instance(&self, config: &OcrConfig) -> bool {
        self.instances
            .lock()
            .remove(&Self::instance_key(config))
            .is_some()
    }

    /// Number of cached instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }
}

impl Default for OcrInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}
