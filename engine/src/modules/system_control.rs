//! System Control Module
//!
//! File management inside the configured workspace: scanning directories,
//! inspecting files, archiving old files and sorting files into folders by
//! type. Every path goes through [`FileSystemGuard`] before any I/O.

use crate::fs_guard::FileSystemGuard;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use sdk::errors::EngineError;
use sdk::module::{InvocationContext, Module};
use sdk::types::{CapabilityDescriptor, ModuleOutput, ParamType, ParameterDescriptor, Params};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Folder names used by `organize_by_type`, checked in order
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Documents", &["pdf", "doc", "docx", "txt", "rtf", "odt"]),
    ("Images", &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"]),
    ("Videos", &["mp4", "avi", "mkv", "mov", "wmv", "flv"]),
    ("Audio", &["mp3", "wav", "flac", "aac", "ogg", "m4a"]),
    ("Archives", &["zip", "rar", "7z", "tar", "gz"]),
    ("Code", &["py", "js", "html", "css", "java", "cpp", "c"]),
    ("Spreadsheets", &["xlsx", "xls", "csv"]),
    ("Presentations", &["pptx", "ppt", "key"]),
];

const OTHER_CATEGORY: &str = "Other";

/// Category folder for a file, by extension
pub fn category_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return OTHER_CATEGORY;
    };
    let ext = ext.to_ascii_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, extensions)| extensions.contains(&ext.as_str()))
        .map(|(name, _)| *name)
        .unwrap_or(OTHER_CATEGORY)
}

#[derive(Debug, Serialize)]
struct FileEntry {
    name: String,
    path: String,
    size: u64,
    size_mb: f64,
    modified: Value,
    extension: String,
}

#[derive(Debug, Serialize)]
struct FileError {
    file: String,
    error: String,
}

pub struct SystemControlModule {
    guard: FileSystemGuard,
    capabilities: Vec<CapabilityDescriptor>,
}

impl SystemControlModule {
    pub const NAME: &'static str = "system_control";

    /// Create the module confined to `workspace`
    pub fn new(workspace: PathBuf) -> Result<Self, EngineError> {
        let guard = FileSystemGuard::new(workspace)?;

        let capabilities = vec![
            CapabilityDescriptor::new("scan_directory", "Scan a directory and list files with details")
                .param(ParameterDescriptor::required(
                    "path",
                    ParamType::String,
                    "Directory path to scan",
                ))
                .param(
                    ParameterDescriptor::optional(
                        "recursive",
                        ParamType::Bool,
                        "Scan subdirectories recursively",
                    )
                    .with_default(json!(false)),
                )
                .param(ParameterDescriptor::optional(
                    "file_types",
                    ParamType::List,
                    "Filter by file extensions (e.g., ['.pdf', '.txt'])",
                ))
                .returns("{directory, file_count, total_size_mb, files}")
                .read_only()
                .example("scan_directory: path='Downloads', recursive=false")
                .example("scan_directory: path='Documents', recursive=true, file_types=['.pdf', '.docx']"),
            CapabilityDescriptor::new(
                "move_old_files",
                "Move files older than specified days to archive folder",
            )
            .param(ParameterDescriptor::required(
                "source_path",
                ParamType::String,
                "Source directory path",
            ))
            .param(ParameterDescriptor::required(
                "days",
                ParamType::Int,
                "Files older than this many days",
            ))
            .param(ParameterDescriptor::optional(
                "archive_path",
                ParamType::String,
                "Archive destination (default: source_path/archive)",
            ))
            .returns("{moved_count, archive_path, moved_files, errors}")
            .example("move_old_files: source_path='Downloads', days=30"),
            CapabilityDescriptor::new("organize_by_type", "Organize files into folders by file type")
                .param(ParameterDescriptor::required(
                    "source_path",
                    ParamType::String,
                    "Directory to organize",
                ))
                .param(
                    ParameterDescriptor::optional(
                        "create_folders",
                        ParamType::Bool,
                        "Create type-based folders (Documents, Images, etc.) and move files",
                    )
                    .with_default(json!(true)),
                )
                .returns("{organized_count, categories, moved, errors}")
                .example("organize_by_type: source_path='Downloads'"),
            CapabilityDescriptor::new("get_file_info", "Get detailed information about a file")
                .param(ParameterDescriptor::required(
                    "file_path",
                    ParamType::String,
                    "Path to file",
                ))
                .returns("{name, path, size, size_mb, created, modified, accessed, extension, is_hidden}")
                .read_only(),
        ];

        Ok(Self {
            guard,
            capabilities,
        })
    }

    pub fn workspace(&self) -> &Path {
        self.guard.workspace()
    }

    /// Resolve a directory argument, reporting a missing or non-directory
    /// path as a module failure rather than an error.
    async fn existing_dir(&self, raw: &str, label: &str) -> Result<Result<PathBuf, ModuleOutput>, EngineError> {
        let path = self.guard.absolutize(raw);
        self.guard.check_denied(&path)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Err(ModuleOutput::error(format!("{} not found: {}", label, raw))));
        }
        let path = self.guard.validate_path(&path)?;
        if !fs::metadata(&path).await?.is_dir() {
            return Ok(Err(ModuleOutput::error(format!("Not a directory: {}", raw))));
        }
        Ok(Ok(path))
    }

    async fn scan_directory(&self, params: &Params, ctx: &InvocationContext) -> Result<ModuleOutput, EngineError> {
        let raw = params.str("path")?;
        let recursive = params.opt_bool("recursive").unwrap_or(false);
        let filter: Option<Vec<String>> = params
            .opt_string_list("file_types")
            .map(|types| types.iter().map(|t| normalize_extension(t)).collect());

        let directory = match self.existing_dir(raw, "Directory").await? {
            Ok(dir) => dir,
            Err(output) => return Ok(output),
        };
        info!("Scanning directory: {} (recursive: {})", directory.display(), recursive);

        let mut files = Vec::new();
        let mut pending = vec![directory.clone()];
        while let Some(dir) = pending.pop() {
            if ctx.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                // Symlinks are not followed; they could lead outside the workspace
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    if recursive && self.guard.check_denied(&path).is_ok() {
                        pending.push(path);
                    }
                    continue;
                }
                if !file_type.is_file() || self.guard.check_denied(&path).is_err() {
                    continue;
                }

                let extension = dotted_extension(&path);
                if let Some(filter) = &filter {
                    if !filter.contains(&extension.to_ascii_lowercase()) {
                        continue;
                    }
                }

                let metadata = entry.metadata().await?;
                files.push((
                    metadata.modified().ok(),
                    FileEntry {
                        name: entry.file_name().to_string_lossy().to_string(),
                        path: path.display().to_string(),
                        size: metadata.len(),
                        size_mb: megabytes(metadata.len()),
                        modified: timestamp(metadata.modified()),
                        extension,
                    },
                ));
            }
        }

        // Newest first
        files.sort_by(|a, b| b.0.cmp(&a.0));
        let total: u64 = files.iter().map(|(_, f)| f.size).sum();
        let files: Vec<FileEntry> = files.into_iter().map(|(_, f)| f).collect();
        debug!("Scanned {} files in {}", files.len(), directory.display());

        Ok(ModuleOutput::json(json!({
            "directory": directory.display().to_string(),
            "file_count": files.len(),
            "total_size_mb": megabytes(total),
            "files": files,
        })))
    }

    async fn move_old_files(&self, params: &Params, ctx: &InvocationContext) -> Result<ModuleOutput, EngineError> {
        let raw = params.str("source_path")?;
        let days = params.i64("days")?;
        if days < 0 {
            return Ok(ModuleOutput::error(format!("days must not be negative, got {}", days)));
        }

        let source = match self.existing_dir(raw, "Source directory").await? {
            Ok(dir) => dir,
            Err(output) => return Ok(output),
        };
        let archive = match params.opt_str("archive_path") {
            Some(archive) => self.guard.absolutize(archive),
            None => source.join("archive"),
        };
        let archive = self.guard.validate_new_path(&archive)?;
        fs::create_dir_all(&archive).await?;

        let now = SystemTime::now();
        let cutoff = (days as u64)
            .checked_mul(SECS_PER_DAY)
            .and_then(|secs| now.checked_sub(Duration::from_secs(secs)))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        info!(
            "Archiving files older than {} days from {} to {}",
            days,
            source.display(),
            archive.display()
        );

        let mut moved = Vec::new();
        let mut errors = Vec::new();
        let mut entries = fs::read_dir(&source).await?;
        while let Some(entry) = entries.next_entry().await? {
            if ctx.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if modified >= cutoff {
                continue;
            }

            let name = entry.file_name();
            let from = entry.path();
            let outcome = async {
                let dest = unique_destination(&archive, &name).await?;
                move_file(&from, &dest).await.map(|()| dest)
            }
            .await;
            match outcome {
                Ok(dest) => moved.push(json!({
                    "name": name.to_string_lossy(),
                    "original_path": from.display().to_string(),
                    "new_path": dest.display().to_string(),
                    "age_days": now.duration_since(modified).unwrap_or_default().as_secs() / SECS_PER_DAY,
                })),
                Err(e) => {
                    warn!("Failed to archive {}: {}", from.display(), e);
                    errors.push(FileError {
                        file: name.to_string_lossy().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(ModuleOutput::json(json!({
            "moved_count": moved.len(),
            "archive_path": archive.display().to_string(),
            "moved_files": moved,
            "errors": errors,
        })))
    }

    async fn organize_by_type(&self, params: &Params, ctx: &InvocationContext) -> Result<ModuleOutput, EngineError> {
        let raw = params.str("source_path")?;
        let create_folders = params.opt_bool("create_folders").unwrap_or(true);

        let source = match self.existing_dir(raw, "Directory").await? {
            Ok(dir) => dir,
            Err(output) => return Ok(output),
        };
        info!("Organizing {} by type (move: {})", source.display(), create_folders);

        let mut categories: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        let mut errors = Vec::new();
        let mut entries = fs::read_dir(&source).await?;
        while let Some(entry) = entries.next_entry().await? {
            if ctx.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let from = entry.path();
            let category = category_for(&from);

            if create_folders {
                let folder = source.join(category);
                let outcome = async {
                    fs::create_dir_all(&folder).await?;
                    let dest = unique_destination(&folder, &name).await?;
                    move_file(&from, &dest).await
                }
                .await;
                if let Err(e) = outcome {
                    warn!("Failed to organize {}: {}", from.display(), e);
                    errors.push(FileError {
                        file: name.to_string_lossy().to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            }
            categories
                .entry(category)
                .or_default()
                .push(name.to_string_lossy().to_string());
        }

        let organized: usize = categories.values().map(Vec::len).sum();
        Ok(ModuleOutput::json(json!({
            "organized_count": organized,
            "categories": categories,
            "moved": create_folders,
            "errors": errors,
        })))
    }

    async fn get_file_info(&self, params: &Params) -> Result<ModuleOutput, EngineError> {
        let raw = params.str("file_path")?;
        let path = self.guard.absolutize(raw);
        self.guard.check_denied(&path)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(ModuleOutput::error(format!("File not found: {}", raw)));
        }
        let path = self.guard.validate_path(&path)?;
        let metadata = fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Ok(ModuleOutput::error(format!("Not a file: {}", raw)));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(ModuleOutput::json(json!({
            "is_hidden": name.starts_with('.'),
            "name": name,
            "path": path.display().to_string(),
            "size": metadata.len(),
            "size_mb": megabytes(metadata.len()),
            "created": timestamp(metadata.created()),
            "modified": timestamp(metadata.modified()),
            "accessed": timestamp(metadata.accessed()),
            "extension": dotted_extension(&path),
        })))
    }
}

#[async_trait]
impl Module for SystemControlModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "File system operations and management"
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn capabilities(&self) -> &[CapabilityDescriptor] {
        &self.capabilities
    }

    async fn invoke(
        &self,
        capability: &str,
        params: Params,
        ctx: &InvocationContext,
    ) -> Result<ModuleOutput, EngineError> {
        match capability {
            "scan_directory" => self.scan_directory(&params, ctx).await,
            "move_old_files" => self.move_old_files(&params, ctx).await,
            "organize_by_type" => self.organize_by_type(&params, ctx).await,
            "get_file_info" => self.get_file_info(&params).await,
            other => Err(EngineError::UnknownCapability {
                module: Self::NAME.to_string(),
                capability: other.to_string(),
            }),
        }
    }
}

/// Extension with its leading dot, or empty
fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Lowercase extension filter entry with a leading dot
fn normalize_extension(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

fn timestamp(time: std::io::Result<SystemTime>) -> Value {
    time.map(|t| Value::String(DateTime::<Local>::from(t).to_rfc3339()))
        .unwrap_or(Value::Null)
}

/// First free `name`, `stem_1.ext`, `stem_2.ext`, ... inside `dir`.
///
/// Fails if existence cannot be checked.
async fn unique_destination(dir: &Path, name: &OsStr) -> std::io::Result<PathBuf> {
    let mut dest = dir.join(name);
    let original = Path::new(name);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = dotted_extension(original);

    let mut counter: u64 = 1;
    while fs::try_exists(&dest).await? {
        dest = dir.join(format!("{}_{}{}", stem, counter, extension));
        counter += 1;
    }
    Ok(dest)
}

/// Rename, falling back to copy and delete across filesystems
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn setup() -> (TempDir, SystemControlModule) {
        let temp = TempDir::new().unwrap();
        let module = SystemControlModule::new(temp.path().to_path_buf()).unwrap();
        (temp, module)
    }

    async fn call(module: &SystemControlModule, capability: &str, raw: Value) -> Result<ModuleOutput, EngineError> {
        let raw: BTreeMap<String, Value> = serde_json::from_value(raw).unwrap();
        let params = module.capability(capability).unwrap().bind(&raw).unwrap();
        let ctx = InvocationContext::new("run", 1, CancellationToken::new());
        module.invoke(capability, params, &ctx).await
    }

    fn age(path: &Path, days: u64) {
        let file = stdfs::OpenOptions::new().write(true).open(path).unwrap();
        let when = SystemTime::now() - Duration::from_secs(days * SECS_PER_DAY);
        file.set_modified(when).unwrap();
    }

    #[test]
    fn test_category_for() {
        assert_eq!(category_for(Path::new("report.PDF")), "Documents");
        assert_eq!(category_for(Path::new("song.flac")), "Audio");
        assert_eq!(category_for(Path::new("data.csv")), "Spreadsheets");
        assert_eq!(category_for(Path::new("Makefile")), "Other");
        assert_eq!(category_for(Path::new("blob.xyz")), "Other");
    }

    #[tokio::test]
    async fn test_scan_directory_filters_and_recurses() {
        let (temp, module) = setup();
        stdfs::create_dir(temp.path().join("nested")).unwrap();
        stdfs::write(temp.path().join("a.pdf"), "aaaa").unwrap();
        stdfs::write(temp.path().join("b.txt"), "bb").unwrap();
        stdfs::write(temp.path().join("nested").join("c.PDF"), "c").unwrap();

        let flat = call(&module, "scan_directory", json!({"path": "."})).await.unwrap();
        assert_eq!(flat.data["file_count"], 2);

        let pdfs = call(
            &module,
            "scan_directory",
            json!({"path": ".", "recursive": true, "file_types": ["pdf"]}),
        )
        .await
        .unwrap();
        assert_eq!(pdfs.data["file_count"], 2);
        let names: Vec<&str> = pdfs.data["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"a.pdf"));
        assert!(names.contains(&"c.PDF"));
    }

    #[tokio::test]
    async fn test_scan_missing_directory_is_reported_failure() {
        let (_temp, module) = setup();
        let output = call(&module, "scan_directory", json!({"path": "nope"})).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("Directory not found: nope"));
    }

    #[tokio::test]
    async fn test_paths_outside_workspace_rejected() {
        let outer = TempDir::new().unwrap();
        let workspace = outer.path().join("ws");
        stdfs::create_dir(&workspace).unwrap();
        stdfs::write(outer.path().join("secret.txt"), "x").unwrap();
        let module = SystemControlModule::new(workspace).unwrap();

        let err = call(&module, "get_file_info", json!({"file_path": "../secret.txt"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PathOutsideWorkspace(_)));

        let err = call(&module, "scan_directory", json!({"path": ".ssh"})).await.unwrap_err();
        assert!(matches!(err, EngineError::PathDenied(_)));
    }

    #[tokio::test]
    async fn test_move_old_files_resolves_conflicts() {
        let (temp, module) = setup();
        let inbox = temp.path().join("inbox");
        stdfs::create_dir_all(inbox.join("archive")).unwrap();
        stdfs::write(inbox.join("old.txt"), "old").unwrap();
        stdfs::write(inbox.join("archive").join("old.txt"), "taken").unwrap();
        stdfs::write(inbox.join("new.txt"), "new").unwrap();
        age(&inbox.join("old.txt"), 40);

        let output = call(&module, "move_old_files", json!({"source_path": "inbox", "days": 30}))
            .await
            .unwrap();

        assert_eq!(output.data["moved_count"], 1);
        assert!(inbox.join("archive").join("old_1.txt").exists());
        assert!(inbox.join("new.txt").exists());
        assert!(!inbox.join("old.txt").exists());
        assert!(output.data["moved_files"][0]["age_days"].as_u64().unwrap() >= 39);
    }

    #[tokio::test]
    async fn test_move_old_files_archive_outside_workspace_rejected() {
        let outer = TempDir::new().unwrap();
        let workspace = outer.path().join("ws");
        stdfs::create_dir(&workspace).unwrap();
        let module = SystemControlModule::new(workspace).unwrap();

        let archive = outer.path().join("elsewhere");
        let err = call(
            &module,
            "move_old_files",
            json!({"source_path": ".", "days": 1, "archive_path": archive.display().to_string()}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::PathOutsideWorkspace(_)));
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_move_old_files_with_huge_age_moves_nothing() {
        let (temp, module) = setup();
        let inbox = temp.path().join("inbox");
        stdfs::create_dir(&inbox).unwrap();
        stdfs::write(inbox.join("recent.txt"), "r").unwrap();

        let output = call(
            &module,
            "move_old_files",
            json!({"source_path": "inbox", "days": 1_000_000_000_000_000_i64}),
        )
        .await
        .unwrap();

        assert!(output.success);
        assert_eq!(output.data["moved_count"], 0);
        assert!(inbox.join("recent.txt").exists());
    }

    #[tokio::test]
    async fn test_unique_destination() {
        let temp = TempDir::new().unwrap();
        let name = OsStr::new("report.txt");

        let free = unique_destination(temp.path(), name).await.unwrap();
        assert_eq!(free, temp.path().join("report.txt"));

        stdfs::write(temp.path().join("report.txt"), "a").unwrap();
        stdfs::write(temp.path().join("report_1.txt"), "b").unwrap();
        let next = unique_destination(temp.path(), name).await.unwrap();
        assert_eq!(next, temp.path().join("report_2.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unique_destination_fails_when_existence_is_unknown() {
        let temp = TempDir::new().unwrap();
        let not_a_dir = temp.path().join("plain");
        stdfs::write(&not_a_dir, "x").unwrap();

        // plain/report.txt cannot be stat'ed: ENOTDIR
        let result = unique_destination(&not_a_dir, OsStr::new("report.txt")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_organize_by_type_moves_files() {
        let (temp, module) = setup();
        stdfs::write(temp.path().join("photo.png"), "p").unwrap();
        stdfs::write(temp.path().join("notes.txt"), "n").unwrap();
        stdfs::write(temp.path().join("blob"), "b").unwrap();

        let output = call(&module, "organize_by_type", json!({"source_path": "."}))
            .await
            .unwrap();

        assert_eq!(output.data["organized_count"], 3);
        assert_eq!(output.data["categories"]["Images"], json!(["photo.png"]));
        assert!(temp.path().join("Images").join("photo.png").exists());
        assert!(temp.path().join("Documents").join("notes.txt").exists());
        assert!(temp.path().join("Other").join("blob").exists());
    }

    #[tokio::test]
    async fn test_organize_without_folders_is_dry_run() {
        let (temp, module) = setup();
        stdfs::write(temp.path().join("clip.mp4"), "v").unwrap();

        let output = call(
            &module,
            "organize_by_type",
            json!({"source_path": ".", "create_folders": false}),
        )
        .await
        .unwrap();

        assert_eq!(output.data["moved"], false);
        assert_eq!(output.data["categories"]["Videos"], json!(["clip.mp4"]));
        assert!(temp.path().join("clip.mp4").exists());
        assert!(!temp.path().join("Videos").exists());
    }

    #[tokio::test]
    async fn test_get_file_info() {
        let (temp, module) = setup();
        stdfs::write(temp.path().join(".hidden.md"), "hello").unwrap();

        let output = call(&module, "get_file_info", json!({"file_path": ".hidden.md"}))
            .await
            .unwrap();
        assert_eq!(output.data["size"], 5);
        assert_eq!(output.data["extension"], ".md");
        assert_eq!(output.data["is_hidden"], true);
        assert!(output.data["modified"].is_string());

        let output = call(&module, "get_file_info", json!({"file_path": "."})).await.unwrap();
        assert_eq!(output.error.as_deref(), Some("Not a file: ."));
    }

    #[test]
    fn test_metadata() {
        let (_temp, module) = setup();
        assert!(module.requires_confirmation());
        assert!(!module.is_read_only());
        assert!(module.capability("scan_directory").unwrap().read_only);
        assert!(module.capability("get_file_info").unwrap().read_only);
        assert!(!module.capability("move_old_files").unwrap().read_only);
    }
}
