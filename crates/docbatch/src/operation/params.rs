//! Per-type parameter payloads carried by a batch operation.
//!
//! Each variant of [`OperationParams`] holds only the settings relevant to its
//! operation type, so dispatch in the executor is checked exhaustively.

use serde::{Deserialize, Serialize};

use super::descriptor::OperationType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationParams {
    Export(ExportOptions),
    Split(SplitOptions),
    Merge(MergeOptions),
    Watermark(WatermarkOptions),
    HeaderFooter(HeaderFooterOptions),
    Security(SecuritySettings),
}

impl OperationParams {
    /// The operation type this payload belongs to.
    pub fn kind(&self) -> OperationType {
        match self {
            OperationParams::Export(_) => OperationType::Export,
            OperationParams::Split(_) => OperationType::Split,
            OperationParams::Merge(_) => OperationType::Merge,
            OperationParams::Watermark(_) => OperationType::Watermark,
            OperationParams::HeaderFooter(_) => OperationType::HeaderFooter,
            OperationParams::Security(_) => OperationType::Security,
        }
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            OperationParams::Export(options) => match &options.security {
                Some(security) => security.validate(),
                None => Ok(()),
            },
            OperationParams::Split(options) => options.validate(),
            OperationParams::Merge(_) => Ok(()),
            OperationParams::Watermark(options) => options.validate(),
            OperationParams::HeaderFooter(options) => {
                if !is_positive(options.style.font_size) {
                    return Err("font size must be positive".to_string());
                }
                Ok(())
            }
            OperationParams::Security(settings) => settings.validate(),
        }
    }
}

/// Finite and greater than zero. Rejects NaN.
fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

// ─── Export ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormatType {
    Pdf,
    PdfA,
    PdfX,
    Png,
    Jpg,
    Docx,
    Xlsx,
    Html,
    Txt,
}

impl ExportFormatType {
    /// File extension used for exported artifacts.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormatType::Pdf | ExportFormatType::PdfA | ExportFormatType::PdfX => "pdf",
            ExportFormatType::Png => "png",
            ExportFormatType::Jpg => "jpg",
            ExportFormatType::Docx => "docx",
            ExportFormatType::Xlsx => "xlsx",
            ExportFormatType::Html => "html",
            ExportFormatType::Txt => "txt",
        }
    }

    /// Upper-case label used in descriptor names.
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormatType::Pdf => "PDF",
            ExportFormatType::PdfA => "PDF-A",
            ExportFormatType::PdfX => "PDF-X",
            ExportFormatType::Png => "PNG",
            ExportFormatType::Jpg => "JPG",
            ExportFormatType::Docx => "DOCX",
            ExportFormatType::Xlsx => "XLSX",
            ExportFormatType::Html => "HTML",
            ExportFormatType::Txt => "TXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFormat {
    #[serde(rename = "type")]
    pub format_type: ExportFormatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
}

impl ExportFormat {
    pub fn new(format_type: ExportFormatType) -> Self {
        Self {
            format_type,
            version: None,
            quality: None,
            dpi: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageRange {
    All,
    Current,
    Range { start: u32, end: u32 },
    Selection { pages: Vec<u32> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,
    #[serde(default)]
    pub include_annotations: bool,
    #[serde(default)]
    pub include_bookmarks: bool,
    #[serde(default)]
    pub include_forms: bool,
    #[serde(default)]
    pub compression: CompressionSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySettings>,
}

impl ExportOptions {
    /// Export with default compression and no security overrides.
    pub fn new(format_type: ExportFormatType) -> Self {
        Self {
            format: ExportFormat::new(format_type),
            page_range: None,
            include_annotations: true,
            include_bookmarks: true,
            include_forms: true,
            compression: CompressionSettings::default(),
            security: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCompression {
    pub enabled: bool,
    pub quality: u8,
    pub downsampling: bool,
    #[serde(rename = "targetDPI")]
    pub target_dpi: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCompression {
    pub enabled: bool,
    pub font_subsetting: bool,
    pub remove_unused_fonts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureCompression {
    pub remove_metadata: bool,
    pub remove_comments: bool,
    pub optimize_structure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub images: ImageCompression,
    pub text: TextCompression,
    pub structure: StructureCompression,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            images: ImageCompression {
                enabled: false,
                quality: 85,
                downsampling: false,
                target_dpi: 150,
            },
            text: TextCompression::default(),
            structure: StructureCompression::default(),
        }
    }
}

// ─── Split ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    Pages,
    Bookmarks,
    Size,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOptions {
    pub method: SplitMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_per_file: Option<u32>,
    /// Maximum part size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub preserve_bookmarks: bool,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_output_format() -> String {
    "pdf".to_string()
}

impl SplitOptions {
    pub fn every_pages(pages_per_file: u32) -> Self {
        Self {
            method: SplitMethod::Pages,
            pages_per_file: Some(pages_per_file),
            max_size: None,
            pattern: None,
            preserve_bookmarks: true,
            output_format: default_output_format(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self.method {
            SplitMethod::Pages => match self.pages_per_file {
                Some(n) if n >= 1 => Ok(()),
                _ => Err("pages method requires pagesPerFile >= 1".to_string()),
            },
            SplitMethod::Size => match self.max_size {
                Some(n) if n > 0 => Ok(()),
                _ => Err("size method requires maxSize > 0".to_string()),
            },
            SplitMethod::Pattern => match self.pattern.as_deref() {
                Some(p) if !p.trim().is_empty() => Ok(()),
                _ => Err("pattern method requires a non-empty pattern".to_string()),
            },
            SplitMethod::Bookmarks => Ok(()),
        }
    }
}

// ─── Merge ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkHandling {
    #[default]
    Preserve,
    Merge,
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageNumbering {
    #[default]
    Continuous,
    Restart,
    None,
}

/// Merge settings. The set of inputs is the operation's file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion_points: Option<Vec<u32>>,
    #[serde(default)]
    pub bookmark_handling: BookmarkHandling,
    #[serde(default)]
    pub page_numbering: PageNumbering,
}

// ─── Watermark ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkPosition {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub alignment: Alignment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkStyle {
    pub opacity: f32,
    /// Degrees, counter-clockwise.
    pub rotation: f32,
    pub scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSelection {
    All,
    Odd,
    Even,
    ExceptFirst,
    Pages(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    pub kind: WatermarkKind,
    pub content: String,
    pub position: WatermarkPosition,
    pub style: WatermarkStyle,
    pub pages: PageSelection,
}

impl WatermarkOptions {
    /// Centered diagonal text watermark on every page.
    pub fn text(content: &str, opacity: f32) -> Self {
        Self {
            kind: WatermarkKind::Text,
            content: content.to_string(),
            position: WatermarkPosition {
                x: 0.0,
                y: 0.0,
                alignment: Alignment::Center,
            },
            style: WatermarkStyle {
                opacity,
                rotation: 45.0,
                scale: 1.0,
                color: None,
                font_size: None,
                font_family: None,
            },
            pages: PageSelection::All,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.style.opacity) {
            return Err(format!(
                "opacity must be within [0, 1], got {}",
                self.style.opacity
            ));
        }
        if !is_positive(self.style.scale) {
            return Err(format!("scale must be positive, got {}", self.style.scale));
        }
        if let Some(size) = self.style.font_size {
            if !is_positive(size) {
                return Err(format!("font size must be positive, got {}", size));
            }
        }
        if self.content.is_empty() {
            return Err("watermark content is empty".to_string());
        }
        Ok(())
    }
}

// ─── Header / footer ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFooterKind {
    Header,
    Footer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalPosition {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterStyle {
    pub font_size: f32,
    pub font_family: String,
    pub color: String,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl Default for HeaderFooterStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            font_family: "Helvetica".to_string(),
            color: "#000000".to_string(),
            margin_top: 20.0,
            margin_bottom: 20.0,
        }
    }
}

/// Placeholders the transform service substitutes into the content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterVariables {
    pub page_number: bool,
    pub total_pages: bool,
    pub date: bool,
    pub time: bool,
    pub title: bool,
    pub author: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderFooterOptions {
    pub kind: HeaderFooterKind,
    #[serde(default)]
    pub position: HorizontalPosition,
    pub content: String,
    #[serde(default)]
    pub style: HeaderFooterStyle,
    #[serde(default)]
    pub variables: HeaderFooterVariables,
    pub pages: PageSelection,
}

impl HeaderFooterOptions {
    pub fn footer(content: &str) -> Self {
        Self {
            kind: HeaderFooterKind::Footer,
            position: HorizontalPosition::Center,
            content: content.to_string(),
            style: HeaderFooterStyle::default(),
            variables: HeaderFooterVariables::default(),
            pages: PageSelection::All,
        }
    }
}

// ─── Security ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionLevel {
    #[default]
    Standard,
    High,
    Aes128,
    Aes256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettings {
    pub enabled: bool,
    #[serde(default)]
    pub level: EncryptionLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_password: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintPermission {
    None,
    LowRes,
    #[default]
    HighRes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditPermission {
    None,
    Inserting,
    FormFilling,
    Commenting,
    PageAssembly,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub printing: PrintPermission,
    pub copying: bool,
    pub editing: EditPermission,
    pub extracting: bool,
    pub accessibility: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            printing: PrintPermission::HighRes,
            copying: true,
            editing: EditPermission::All,
            extracting: true,
            accessibility: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySettings {
    pub encryption: EncryptionSettings,
    #[serde(default)]
    pub permissions: Permissions,
}

impl SecuritySettings {
    /// AES-256 encryption with an owner password and the given permissions.
    pub fn encrypted(owner_password: &str, permissions: Permissions) -> Self {
        Self {
            encryption: EncryptionSettings {
                enabled: true,
                level: EncryptionLevel::Aes256,
                user_password: None,
                owner_password: Some(owner_password.to_string()),
            },
            permissions,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let has_password = |p: &Option<String>| p.as_deref().is_some_and(|s| !s.is_empty());
        if self.encryption.enabled
            && !has_password(&self.encryption.user_password)
            && !has_password(&self.encryption.owner_password)
        {
            return Err("encryption requires a user or owner password".to_string());
        }
        Ok(())
    }
}
