//! Feature vector assembly.
//!
//! [`Extractor`] drives the structural reader and the entropy calculator
//! to produce the flat 20-key mapping the downstream classifier was
//! trained on. The key set is fixed: directory-derived values default to
//! zero when the directory is absent, and the only way a file yields no
//! vector at all is a header chain that cannot be parsed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::config::ExtractorConfig;
use crate::entropy::Stats;
use crate::error::{Error, Result};
use crate::io::load_file;
use crate::pe::PeImage;

/// Feature key names, in serialization order.
///
/// This order and these spellings are the contract with the classifier
/// artifact; they must not change between versions.
pub const FEATURE_NAMES: [&str; 20] = [
    "SizeOfCode",
    "SizeOfInitializedData",
    "AddressOfEntryPoint",
    "ImageBase",
    "Subsystem",
    "DllCharacteristics",
    "SizeOfStackReserve",
    "SizeOfHeapReserve",
    "NumberOfRvaAndSizes",
    "SectionsMeanEntropy",
    "SectionsMinEntropy",
    "SectionsMaxEntropy",
    "ImportsNbDLL",
    "ImportsNb",
    "ExportsNb",
    "ResourcesNb",
    "ResourcesMeanEntropy",
    "ResourcesMinEntropy",
    "ResourcesMaxEntropy",
    "VersionInformationSize",
];

/// The extracted feature vector.
///
/// Field order matches [`FEATURE_NAMES`]; serde emits the keys in
/// declaration order, so serialized output is deterministic. Counts and
/// header fields are unsigned integers, entropy statistics are doubles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "SizeOfCode")]
    pub size_of_code: u64,
    #[serde(rename = "SizeOfInitializedData")]
    pub size_of_initialized_data: u64,
    #[serde(rename = "AddressOfEntryPoint")]
    pub address_of_entry_point: u64,
    #[serde(rename = "ImageBase")]
    pub image_base: u64,
    #[serde(rename = "Subsystem")]
    pub subsystem: u64,
    #[serde(rename = "DllCharacteristics")]
    pub dll_characteristics: u64,
    #[serde(rename = "SizeOfStackReserve")]
    pub size_of_stack_reserve: u64,
    #[serde(rename = "SizeOfHeapReserve")]
    pub size_of_heap_reserve: u64,
    #[serde(rename = "NumberOfRvaAndSizes")]
    pub number_of_rva_and_sizes: u64,
    #[serde(rename = "SectionsMeanEntropy")]
    pub sections_mean_entropy: f64,
    #[serde(rename = "SectionsMinEntropy")]
    pub sections_min_entropy: f64,
    #[serde(rename = "SectionsMaxEntropy")]
    pub sections_max_entropy: f64,
    #[serde(rename = "ImportsNbDLL")]
    pub imports_nb_dll: u64,
    #[serde(rename = "ImportsNb")]
    pub imports_nb: u64,
    #[serde(rename = "ExportsNb")]
    pub exports_nb: u64,
    #[serde(rename = "ResourcesNb")]
    pub resources_nb: u64,
    #[serde(rename = "ResourcesMeanEntropy")]
    pub resources_mean_entropy: f64,
    #[serde(rename = "ResourcesMinEntropy")]
    pub resources_min_entropy: f64,
    #[serde(rename = "ResourcesMaxEntropy")]
    pub resources_max_entropy: f64,
    #[serde(rename = "VersionInformationSize")]
    pub version_information_size: u64,
}

impl FeatureVector {
    /// Serialize to the flat JSON object consumed by the classifier.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Internal(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }
}

/// Feature extractor.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the feature vector from a file on disk.
    pub fn extract_path<P: AsRef<Path>>(&self, path: P) -> Result<FeatureVector> {
        let path = path.as_ref();
        let data = load_file(path, &self.config.io).map_err(|source| Error::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract_bytes(&data)
    }

    /// Extract the feature vector from an in-memory image.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<FeatureVector> {
        let span = info_span!("extract", size = data.len());
        let _guard = span.enter();

        let pe = PeImage::parse_with_options(data, self.config.pe.clone())?;

        let header = pe.optional_header();

        // Per-section entropy, in table order.
        let section_entropies: Vec<f64> =
            pe.sections().iter().map(|s| s.entropy(data)).collect();
        let section_stats = Stats::from_values_or_zero(&section_entropies);

        let imports = pe.imports();
        let exports = pe.exports();

        // Only valid (resolvable) resource leaves contribute to the count
        // and the entropy aggregates.
        let mut resource_entropies = Vec::new();
        if let Some(resources) = pe.resources() {
            for (_, leaf) in resources.leaves() {
                if let Some(bytes) = leaf.data {
                    resource_entropies.push(crate::entropy::shannon_entropy(bytes));
                }
            }
        }
        let resource_stats = Stats::from_values_or_zero(&resource_entropies);

        debug!(
            sections = section_entropies.len(),
            dlls = imports.dll_count(),
            imports = imports.count(),
            exports = exports.count(),
            resources = resource_entropies.len(),
            "assembled feature vector"
        );

        Ok(FeatureVector {
            size_of_code: header.size_of_code() as u64,
            size_of_initialized_data: header.size_of_initialized_data() as u64,
            address_of_entry_point: header.entry_point() as u64,
            image_base: header.image_base(),
            subsystem: header.subsystem_raw() as u64,
            dll_characteristics: header.dll_characteristics() as u64,
            size_of_stack_reserve: header.size_of_stack_reserve(),
            size_of_heap_reserve: header.size_of_heap_reserve(),
            number_of_rva_and_sizes: header.number_of_rva_and_sizes() as u64,
            sections_mean_entropy: section_stats.mean,
            sections_min_entropy: section_stats.min,
            sections_max_entropy: section_stats.max,
            imports_nb_dll: imports.dll_count() as u64,
            imports_nb: imports.count() as u64,
            exports_nb: exports.count() as u64,
            resources_nb: resource_entropies.len() as u64,
            resources_mean_entropy: resource_stats.mean,
            resources_min_entropy: resource_stats.min,
            resources_max_entropy: resource_stats.max,
            version_information_size: pe.version_info_size(),
        })
    }
}
