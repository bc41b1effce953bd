//! The record type and its static column table.
//!
//! Data files map header names onto record fields through [`SCHEMA`], a table
//! generated together with [`Record`] so the two can never drift apart. Header
//! lookup is case-insensitive and ignores underscores (`abd_area`, `AbdArea`
//! and `ABDAREA` all name the same column).

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use uuid::Uuid;

use super::cell::{CellKind, CellValue, SortKey};

/// A column of the data-file schema with typed accessors into [`Record`].
#[derive(Clone, Copy)]
pub struct Column {
    /// Canonical header name, written on save
    pub name: &'static str,
    /// Declared cell type
    pub kind: CellKind,
    read: fn(&mut Record, &str) -> Result<(), String>,
    write: fn(&Record) -> String,
    key: fn(&Record) -> SortKey<'_>,
}

impl Column {
    /// Parse `text` into this column of `record`.
    pub fn read(&self, record: &mut Record, text: &str) -> Result<(), String> {
        (self.read)(record, text)
    }

    /// Serialize this column of `record`.
    pub fn write(&self, record: &Record) -> String {
        (self.write)(record)
    }

    /// Sort key of this column for `record`.
    pub fn sort_key<'a>(&self, record: &'a Record) -> SortKey<'a> {
        (self.key)(record)
    }

    /// Look up a column by header text.
    ///
    /// Matching strips underscores and ignores ASCII case.
    pub fn lookup(header: &str) -> Option<&'static Column> {
        static INDEX: OnceLock<HashMap<String, usize>> = OnceLock::new();
        let index = INDEX.get_or_init(|| {
            SCHEMA
                .iter()
                .enumerate()
                .map(|(i, column)| (normalize_header(column.name), i))
                .collect()
        });
        index
            .get(&normalize_header(header))
            .map(|&i| &SCHEMA[i])
    }

    /// Look up a column by its canonical name.
    pub fn named(name: &str) -> Option<&'static Column> {
        SCHEMA.iter().find(|column| column.name == name)
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Column {}

/// Normalize a header token for schema lookup.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! record_schema {
    ($( $(#[$meta:meta])* $field:ident : $ty:ty => $name:literal ),+ $(,)?) => {
        /// One classified particle image.
        ///
        /// Measurement fields come straight from the instrument export; the
        /// four label fields hold the predicted and confirmed labels of the
        /// two processing stages.
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct Record {
            $( $(#[$meta])* pub $field: $ty, )+
        }

        /// Every column of the data-file schema, in the order written on save.
        pub static SCHEMA: &[Column] = &[
            $(
                Column {
                    name: $name,
                    kind: <$ty as CellValue>::KIND,
                    read: |record, text| {
                        record.$field = <$ty as CellValue>::parse_cell(text)?;
                        Ok(())
                    },
                    write: |record| record.$field.write_cell(),
                    key: |record| record.$field.sort_key(),
                },
            )+
        ];
    };
}

record_schema! {
    name: String => "Name",
    date: String => "Date",
    time: String => "Time",
    collage_file: String => "CollageFile",
    image_filename: String => "ImageFilename",
    /// Session display identity (1-based). On disk this column holds the
    /// file-local identity, which is kept in the origin map.
    id: i32 => "Id",
    group_id: i32 => "GroupId",
    /// Process-wide unique identity
    uuid: Uuid => "Uuid",
    src_image: i32 => "SrcImage",
    src_x: i32 => "SrcX",
    src_y: i32 => "SrcY",
    image_x: i32 => "ImageX",
    image_y: i32 => "ImageY",
    image_w: i32 => "ImageW",
    image_h: i32 => "ImageH",
    timestamp: String => "Timestamp",
    elapsed_time: f64 => "ElapsedTime",
    cal_const: f64 => "CalConst",
    cal_image: i32 => "CalImage",
    abd_area: f64 => "AbdArea",
    abd_diameter: f64 => "AbdDiameter",
    abd_volume: f64 => "AbdVolume",
    aspect_ratio: f64 => "AspectRatio",
    avg_blue: f64 => "AvgBlue",
    avg_green: f64 => "AvgGreen",
    avg_red: f64 => "AvgRed",
    biovolume_cylinder: f64 => "BiovolumeCylinder",
    biovolume_p_spheroid: f64 => "BiovolumePSpheroid",
    biovolume_sphere: f64 => "BiovolumeSphere",
    ch1_area: f64 => "Ch1Area",
    ch1_peak: f64 => "Ch1Peak",
    ch1_width: f64 => "Ch1Width",
    ch2_area: f64 => "Ch2Area",
    ch2_peak: f64 => "Ch2Peak",
    ch2_width: f64 => "Ch2Width",
    ch3_area: f64 => "Ch3Area",
    ch3_peak: f64 => "Ch3Peak",
    ch3_width: f64 => "Ch3Width",
    ch2_ch1_ratio: f64 => "Ch2Ch1Ratio",
    circle_fit: f64 => "CircleFit",
    circularity: f64 => "Circularity",
    circularity_hu: f64 => "CircularityHu",
    compactness: f64 => "Compactness",
    convexity: f64 => "Convexity",
    convex_perimeter: f64 => "ConvexPerimeter",
    edge_gradient: f64 => "EdgeGradient",
    elongation: f64 => "Elongation",
    esd_diameter: f64 => "EsdDiameter",
    esd_volume: f64 => "EsdVolume",
    fd_diameter: f64 => "FdDiameter",
    feret_max_angle: f64 => "FeretMaxAngle",
    feret_min_angle: f64 => "FeretMinAngle",
    fiber_curl: f64 => "FiberCurl",
    fiber_straightness: f64 => "FiberStraightness",
    filled_area: f64 => "FilledArea",
    filter_score: f64 => "FilterScore",
    geodesic_aspect_ratio: f64 => "GeodesicAspectRatio",
    geodesic_length: f64 => "GeodesicLength",
    geodesic_thickness: f64 => "GeodesicThickness",
    intensity: f64 => "Intensity",
    length: f64 => "Length",
    ppc: i32 => "Ppc",
    perimeter: f64 => "Perimeter",
    ratio_blue_green: f64 => "RatioBlueGreen",
    ratio_red_blue: f64 => "RatioRedBlue",
    ratio_red_green: f64 => "RatioRedGreen",
    roughness: f64 => "Roughness",
    scatter_area: f64 => "ScatterArea",
    scatter_peak: f64 => "ScatterPeak",
    sigma_intensity: f64 => "SigmaIntensity",
    sphere_complement: i32 => "SphereComplement",
    sphere_count: i32 => "SphereCount",
    sphere_unknown: i32 => "SphereUnknown",
    sphere_volume: f64 => "SphereVolume",
    sum_intensity: f64 => "SumIntensity",
    symmetry: f64 => "Symmetry",
    transparency: f64 => "Transparency",
    width: f64 => "Width",
    /// Stage-A predicted label
    preprocessing: String => "Preprocessing",
    /// Stage-A confirmed label
    preprocessing_true: String => "PreprocessingTrue",
    /// Stage-B predicted label
    label_predicted: String => "LabelPredicted",
    probability_score: f64 => "ProbabilityScore",
    /// Stage-B confirmed label
    label_true: String => "LabelTrue",
    biovolume_ms: f64 => "BiovolumeMS",
    surface_area_ms: f64 => "SurfaceAreaMS",
}

impl Record {
    /// Create an empty record with the given identity.
    pub fn with_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case_and_underscores() {
        let column = Column::lookup("abd_area").unwrap();
        assert_eq!(column.name, "AbdArea");
        assert_eq!(Column::lookup("ABDAREA"), Some(column));
        assert_eq!(Column::lookup("Label_True").unwrap().name, "LabelTrue");
        assert!(Column::lookup("not_a_column").is_none());
    }

    #[test]
    fn test_schema_names_unique_after_normalization() {
        let mut seen = std::collections::HashSet::new();
        for column in SCHEMA {
            assert!(seen.insert(normalize_header(column.name)), "{}", column.name);
        }
    }

    #[test]
    fn test_read_write_through_table() {
        let mut record = Record::default();
        let column = Column::named("EsdDiameter").unwrap();
        column.read(&mut record, "12.25").unwrap();
        assert_eq!(record.esd_diameter, 12.25);
        assert_eq!(column.write(&record), "12.25");

        let label = Column::named("LabelTrue").unwrap();
        label.read(&mut record, "algae").unwrap();
        assert_eq!(record.label_true, "algae");
        assert_eq!(label.kind, CellKind::Text);
    }

    #[test]
    fn test_read_reports_type_errors() {
        let mut record = Record::default();
        let column = Column::named("Ppc").unwrap();
        assert!(column.read(&mut record, "abc").is_err());
        assert_eq!(record.ppc, 0);
    }

    #[test]
    fn test_schema_order() {
        assert_eq!(SCHEMA[0].name, "Name");
        assert_eq!(SCHEMA[SCHEMA.len() - 1].name, "SurfaceAreaMS");
    }
}
