use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Root configuration structure, deserialized from `.riskmap/config.toml`.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub analysis: AnalysisConfig,
    pub boundary: BoundaryConfig,
    /// Raw indicator tables, merged in this order.
    pub sources: Vec<SourceSpec>,
    /// Regions that newer statistics list separately but older boundary
    /// files still draw inside their parent.
    pub split_regions: Vec<SplitRegion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Aggregated statistics table, relative to `data_dir`.
    pub stats_file: PathBuf,
    /// Boundary GeoJSON, relative to `data_dir`.
    pub boundary_file: PathBuf,
    /// Rendered images, relative to `output_dir`.
    pub map_image: PathBuf,
    pub scatter_image: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub target_province: String,
    pub region_column: String,
    pub clusters: usize,
    pub seed: u64,
    pub restarts: usize,
    /// Feature columns used for clustering; must exist in the aggregated table.
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub province_field: String,
    pub region_field: String,
    /// Douglas-Peucker tolerance in degrees; `0` disables simplification.
    pub simplify_tolerance: f64,
}

/// A raw indicator table and the category prefix its columns receive.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceSpec {
    pub category: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SplitRegion {
    /// Join key of the split-off region, e.g. `PANGANDARAN`.
    pub child: String,
    /// Join key of the region whose geometry still contains it.
    pub parent: String,
}

impl Default for Config {
    fn default() -> Self {
        let sources = [
            ("risiko", "indeks_risiko.csv"),
            ("banjir", "banjir.csv"),
            ("gempa", "gempa.csv"),
            ("longsor", "longsor.csv"),
            ("cuaca", "cuaca_ekstrem.csv"),
            ("rumah", "kerusakan_rumah.csv"),
        ]
        .into_iter()
        .map(|(category, file)| SourceSpec {
            category: category.to_string(),
            file: file.to_string(),
        })
        .collect();

        Config {
            paths: PathsConfig::default(),
            analysis: AnalysisConfig::default(),
            boundary: BoundaryConfig::default(),
            sources,
            split_regions: vec![SplitRegion {
                child: "PANGANDARAN".to_string(),
                parent: "CIAMIS".to_string(),
            }],
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            data_dir: PathBuf::from("dataset"),
            output_dir: PathBuf::from("output"),
            stats_file: PathBuf::from("data_agregat_bencana.csv"),
            boundary_file: PathBuf::from("gadm41_IDN_4.json"),
            map_image: PathBuf::from("peta_risiko_final.png"),
            scatter_image: PathBuf::from("plot_pca_cluster.png"),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            target_province: "JawaBarat".to_string(),
            region_column: "nama_kabupaten_kota".to_string(),
            clusters: 3,
            seed: 42,
            restarts: 10,
            features: [
                "risiko_indeks_risiko_bencana",
                "banjir_jumlah_banjir",
                "gempa_jumlah_gempa_bumi",
                "longsor_jumlah_tanah_longsor",
                "cuaca_jumlah_kerusakan",
                "rumah_jumlah_kerusakan",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            province_field: "NAME_1".to_string(),
            region_field: "NAME_2".to_string(),
            simplify_tolerance: 0.005,
        }
    }
}

impl PathsConfig {
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join(&self.stats_file)
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.data_dir.join(&self.boundary_file)
    }

    pub fn map_path(&self) -> PathBuf {
        self.output_dir.join(&self.map_image)
    }

    pub fn scatter_path(&self) -> PathBuf {
        self.output_dir.join(&self.scatter_image)
    }
}

/// Load the pipeline configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<working_dir>/.riskmap/config.toml`
/// 3. `~/.config/riskmap/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(working_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = working_dir.join(".riskmap").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("riskmap").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = Config::default();
        assert_eq!(cfg.analysis.clusters, 3);
        assert_eq!(cfg.analysis.seed, 42);
        assert_eq!(cfg.analysis.features.len(), 6);
        assert_eq!(cfg.sources[0].category, "risiko");
        assert_eq!(cfg.sources.len(), 6);
        assert_eq!(
            cfg.paths.stats_path(),
            PathBuf::from("dataset/data_agregat_bencana.csv")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [analysis]
            target_province = "Banten"
            clusters = 4

            [[sources]]
            category = "banjir"
            file = "banjir.csv"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.target_province, "Banten");
        assert_eq!(cfg.analysis.clusters, 4);
        assert_eq!(cfg.analysis.seed, 42);
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.boundary.region_field, "NAME_2");
        assert_eq!(cfg.split_regions[0].child, "PANGANDARAN");
    }

    #[test]
    fn test_project_config_found() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".riskmap");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[analysis]\nclusters = 5\n").unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.analysis.clusters, 5);
    }

    #[test]
    fn test_override_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".riskmap");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[analysis]\nclusters = 5\n").unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[analysis]\nclusters = 2\n").unwrap();

        let cfg = load_config(dir.path(), Some(explicit.as_path())).unwrap();
        assert_eq!(cfg.analysis.clusters, 2);
    }

    #[test]
    fn test_override_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path(), Some(dir.path().join("nope.toml").as_path())).is_err());
    }
}
