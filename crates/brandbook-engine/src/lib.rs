use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use brandbook_contracts::events::EventWriter;
use brandbook_contracts::guideline::{
    normalize, PartialGuideline, PartialImageCategory, VisualGuideRules,
};
use brandbook_contracts::locales::language_name_for;
use brandbook_contracts::render::render_markdown;
use brandbook_contracts::synth::{synthesize_prompts, ImagePromptPair};
use indexmap::IndexMap;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_IMAGES_PER_REQUEST: u64 = 4;

/// Whether a failed invocation is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("image fetch failed ({url}): {message}")]
    ImageFetch { url: String, message: String },
    #[error("vision model invocation failed: {message}")]
    Invocation { kind: ErrorKind, message: String },
    #[error("model response contained no recognizable guideline content")]
    Validation,
    #[error("analysis failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: usize,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    fn transient(message: impl Into<String>) -> Self {
        Self::Invocation {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    fn permanent(message: impl Into<String>) -> Self {
        Self::Invocation {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// Only `Transient` invocation failures re-enter the retry loop;
    /// everything else surfaces immediately.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invocation { kind, .. } => *kind,
            Self::ImageFetch { .. } | Self::Validation | Self::Failed { .. } => {
                ErrorKind::Permanent
            }
        }
    }
}

/// One combined analysis request: the instruction text plus every image,
/// already encoded as data URLs, in caller order.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image_data_urls: Vec<String>,
    pub temperature: f64,
    pub max_tokens: u64,
}

/// A vision-capable language model. Implementations must be stateless
/// across calls so concurrent analyses can share one handle.
pub trait VisionModel: Send + Sync {
    fn name(&self) -> &str;
    /// Returns the primary message content for the request.
    fn complete(&self, request: &VisionRequest) -> std::result::Result<String, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub url: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl FetchedImage {
    pub fn to_data_url(&self) -> String {
        let mime = self
            .mime_type
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or("image/png");
        format!("data:{mime};base64,{}", BASE64.encode(&self.bytes))
    }
}

pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

pub struct HttpImageFetcher {
    http: HttpClient,
    request_timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            http: HttpClient::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .with_context(|| format!("failed downloading image ({url})"))?;
        let status = response.status();
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .or_else(|| mime_for_url(url).map(str::to_string));
        if !status.is_success() {
            let code = status.as_u16();
            let body = response.text().unwrap_or_default();
            bail!(
                "image download failed ({code}): {}",
                truncate_text(&body, 256)
            );
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("failed reading image bytes ({url})"))?
            .to_vec();
        if bytes.is_empty() {
            bail!("image download returned an empty body ({url})");
        }
        Ok(FetchedImage {
            url: url.to_string(),
            bytes,
            mime_type,
        })
    }
}

/// OpenAI-compatible chat-completions client used as the vision model.
///
/// Sends one `user` message whose content mixes a text part with one
/// `image_url` part per attachment, and reads
/// `choices[0].message.content` back.
pub struct OpenAiVisionModel {
    api_base: String,
    model: String,
    api_key: String,
    http: HttpClient,
    request_timeout: Duration,
}

impl OpenAiVisionModel {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            http: HttpClient::new(),
            request_timeout: Duration::from_secs(90),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_base = non_empty_env("BRANDBOOK_VISION_API_BASE")
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let model =
            non_empty_env("BRANDBOOK_VISION_MODEL").unwrap_or_else(|| "gpt-4o".to_string());
        let Some(api_key) =
            non_empty_env("BRANDBOOK_VISION_API_KEY").or_else(|| non_empty_env("OPENAI_API_KEY"))
        else {
            bail!("BRANDBOOK_VISION_API_KEY (or OPENAI_API_KEY) not set");
        };
        Ok(Self::new(api_base, model, api_key))
    }

    fn payload(&self, request: &VisionRequest) -> Value {
        let mut content = vec![json!({
            "type": "text",
            "text": request.prompt,
        })];
        for data_url in &request.image_data_urls {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": data_url },
            }));
        }
        json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": content,
            }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

impl VisionModel for OpenAiVisionModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, request: &VisionRequest) -> std::result::Result<String, AnalysisError> {
        let endpoint = format!("{}/chat/completions", self.api_base);
        let response = match self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&self.payload(request))
            .send()
        {
            Ok(response) => response,
            Err(raw) => {
                let err =
                    anyhow::Error::new(raw).context(format!("vision request failed ({endpoint})"));
                let kind = if is_retryable_transport_error(&err) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Permanent
                };
                return Err(AnalysisError::Invocation {
                    kind,
                    message: error_chain_text(&err, 400),
                });
            }
        };

        let status = response.status();
        let code = status.as_u16();
        let body = response
            .text()
            .map_err(|raw| AnalysisError::transient(format!("response body read failed: {raw}")))?;
        if !status.is_success() {
            let message = format!(
                "vision request failed ({code}): {}",
                truncate_text(&body, 512)
            );
            return Err(if is_retryable_status(code) {
                AnalysisError::transient(message)
            } else {
                AnalysisError::permanent(message)
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|_| {
            AnalysisError::transient(format!(
                "vision service returned invalid JSON payload: {}",
                truncate_text(&body, 256)
            ))
        })?;
        let content = payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(AnalysisError::transient(
                "vision response missing message content",
            ));
        }
        Ok(content)
    }
}

/// Builds the single analysis instruction sent alongside the images.
///
/// States the target output language by name, enumerates every field the
/// model must populate, and asks for a fenced JSON block. Pure; an
/// unrecognized locale silently falls back to English (US).
pub fn build_analysis_prompt(locale: &str, brand_context: Option<&str>) -> String {
    let language = language_name_for(locale);
    let mut prompt = String::new();
    prompt.push_str(
        "You are a senior brand art director. Analyze the attached brand images and distill \
a visual brand guideline from them.\n\n",
    );
    prompt.push_str(&format!(
        "Write every text value in {language}. Respond with a single fenced ```json block \
containing exactly this object:\n\n",
    ));
    prompt.push_str(
        "- \"general_principles\": array of strings; the overarching rules the imagery follows.\n\
- \"style_direction\": object with string fields \"lighting\", \"colour\", \"composition\" \
and \"format\" describing the dominant visual treatment.\n\
- \"palette\": object with \"primary\", \"secondary\" and \"neutrals\", each an array of hex \
colour strings actually observed in the images.\n\
- \"people_and_emotions\": array of strings; how people appear and what they express.\n\
- \"types_of_images\": array of objects with \"category_name\", optional \"subject_matter\", \
optional \"context\" and an \"examples\" array of concrete shot descriptions.\n\
- \"neuro_triggers\": array of strings; sensory or emotional cues the imagery relies on.\n\
- \"variation_rules\": array of strings; what must vary between images and what must not.\n\
- \"prompting_guidance\": array of strings; how to phrase prompts that reproduce this style.\n\
- \"producer_notes\": object with string fields \"camera\", \"lighting\", \"angle\" and \
\"scene\" for photographers.\n\n",
    );
    prompt.push_str(
        "Base every value on what the images actually show. Do not add prose outside the \
fenced JSON block.\n",
    );
    if let Some(context) = brand_context.map(str::trim).filter(|text| !text.is_empty()) {
        prompt.push_str("\nBrand context provided by the customer:\n");
        prompt.push_str(context);
        prompt.push('\n');
    }
    prompt
}

/// How the raw model output was turned into a partial guideline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    StrictJson,
    Heuristic,
}

/// Extracts a partial guideline from raw model output. Never fails: input
/// with no recognizable structure yields an empty partial.
pub fn parse_guideline(raw: &str) -> PartialGuideline {
    parse_guideline_with_mode(raw).0
}

pub fn parse_guideline_with_mode(raw: &str) -> (PartialGuideline, ParseMode) {
    let candidate = extract_json_candidate(raw);
    if let Ok(partial) = serde_json::from_str::<PartialGuideline>(candidate) {
        return (partial, ParseMode::StrictJson);
    }
    (heuristic_parse(raw), ParseMode::Heuristic)
}

/// Inner text of the first ```json fence, else the raw text verbatim.
fn extract_json_candidate(raw: &str) -> &str {
    let mut search = 0;
    while let Some(offset) = raw[search..].find("```") {
        let fence_start = search + offset + 3;
        let rest = &raw[fence_start..];
        let tag_end = rest.find('\n').unwrap_or(rest.len());
        if rest[..tag_end].trim().eq_ignore_ascii_case("json") {
            let body = &rest[tag_end..];
            return match body.find("```") {
                Some(close) => body[..close].trim(),
                None => body.trim(),
            };
        }
        search = fence_start;
    }
    raw.trim()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    GeneralPrinciples,
    PalettePrimary,
    PaletteSecondary,
    PaletteNeutrals,
    StyleLighting,
    StyleColour,
    StyleComposition,
    StyleFormat,
    PeopleAndEmotions,
    ImageTypes,
    Examples,
    NeuroTriggers,
    VariationRules,
    PromptingGuidance,
    ProducerCamera,
    ProducerAngle,
    ProducerScene,
}

// Most specific keyword first: "secondary colours" must not land on the
// bare "colour" entry.
const HEADING_KEYWORDS: &[(&str, Section)] = &[
    ("general principles", Section::GeneralPrinciples),
    ("principles", Section::GeneralPrinciples),
    ("secondary", Section::PaletteSecondary),
    ("neutral", Section::PaletteNeutrals),
    ("primary", Section::PalettePrimary),
    ("palette", Section::PalettePrimary),
    ("lighting", Section::StyleLighting),
    ("composition", Section::StyleComposition),
    ("format", Section::StyleFormat),
    ("colour", Section::StyleColour),
    ("color", Section::StyleColour),
    ("people", Section::PeopleAndEmotions),
    ("emotion", Section::PeopleAndEmotions),
    ("mood", Section::PeopleAndEmotions),
    ("subjects", Section::PeopleAndEmotions),
    ("types of images", Section::ImageTypes),
    ("image types", Section::ImageTypes),
    ("categories", Section::ImageTypes),
    ("examples", Section::Examples),
    ("textures", Section::NeuroTriggers),
    ("neuro", Section::NeuroTriggers),
    ("trigger", Section::NeuroTriggers),
    ("variation", Section::VariationRules),
    ("don't", Section::VariationRules),
    ("negative prompt", Section::VariationRules),
    ("base prompt", Section::PromptingGuidance),
    ("prompting", Section::PromptingGuidance),
    ("prompt", Section::PromptingGuidance),
    ("do's", Section::PromptingGuidance),
    ("guidance", Section::PromptingGuidance),
    ("camera", Section::ProducerCamera),
    ("angle", Section::ProducerAngle),
    ("scene", Section::ProducerScene),
];

#[derive(Debug, Clone)]
enum SectionValue {
    Items(Vec<String>),
    Text(String),
}

impl SectionValue {
    fn into_items(self) -> Vec<String> {
        match self {
            Self::Items(items) => items,
            Self::Text(text) => vec![text],
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Items(items) => items.join("; "),
        }
    }
}

fn heading_section(line: &str) -> Option<Section> {
    let trimmed = line.trim();
    let is_markdown_heading = trimmed.starts_with('#');
    let cleaned = trimmed.trim_start_matches(['#', '*', ' ']).trim_end();
    let has_colon = cleaned.ends_with(':');
    let cleaned = cleaned.trim_end_matches(':').trim().to_ascii_lowercase();
    if cleaned.is_empty() {
        return None;
    }
    for (keyword, section) in HEADING_KEYWORDS {
        if cleaned == *keyword {
            return Some(*section);
        }
        if (is_markdown_heading || has_colon) && cleaned.contains(keyword) {
            return Some(*section);
        }
    }
    None
}

/// Line-oriented fallback for free-text model output: headings move a
/// current-section pointer, bullets append to the section's list, plain
/// lines set the section's scalar unless a list already exists.
fn heuristic_parse(raw: &str) -> PartialGuideline {
    let mut sections: IndexMap<Section, SectionValue> = IndexMap::new();
    let mut current: Option<Section> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('•'))
        {
            let Some(section) = current else { continue };
            let item = rest.trim().to_string();
            if item.is_empty() {
                continue;
            }
            match sections.get_mut(&section) {
                Some(SectionValue::Items(items)) => items.push(item),
                _ => {
                    sections.insert(section, SectionValue::Items(vec![item]));
                }
            }
            continue;
        }
        if let Some(section) = heading_section(trimmed) {
            current = Some(section);
            continue;
        }
        let Some(section) = current else { continue };
        if !matches!(sections.get(&section), Some(SectionValue::Items(_))) {
            sections.insert(section, SectionValue::Text(trimmed.to_string()));
        }
    }

    fold_sections(sections)
}

fn fold_sections(sections: IndexMap<Section, SectionValue>) -> PartialGuideline {
    fn append_items(slot: &mut Option<Vec<String>>, items: Vec<String>) {
        slot.get_or_insert_with(Vec::new).extend(items);
    }

    let mut partial = PartialGuideline::default();
    for (section, value) in sections {
        match section {
            Section::GeneralPrinciples => {
                append_items(&mut partial.general_principles, value.into_items());
            }
            Section::PalettePrimary => {
                let palette = partial.palette.get_or_insert_with(Default::default);
                append_items(&mut palette.primary, value.into_items());
            }
            Section::PaletteSecondary => {
                let palette = partial.palette.get_or_insert_with(Default::default);
                append_items(&mut palette.secondary, value.into_items());
            }
            Section::PaletteNeutrals => {
                let palette = partial.palette.get_or_insert_with(Default::default);
                append_items(&mut palette.neutrals, value.into_items());
            }
            Section::StyleLighting => {
                partial
                    .style_direction
                    .get_or_insert_with(Default::default)
                    .lighting = Some(value.into_text());
            }
            Section::StyleColour => {
                partial
                    .style_direction
                    .get_or_insert_with(Default::default)
                    .colour = Some(value.into_text());
            }
            Section::StyleComposition => {
                partial
                    .style_direction
                    .get_or_insert_with(Default::default)
                    .composition = Some(value.into_text());
            }
            Section::StyleFormat => {
                partial
                    .style_direction
                    .get_or_insert_with(Default::default)
                    .format = Some(value.into_text());
            }
            Section::PeopleAndEmotions => {
                append_items(&mut partial.people_and_emotions, value.into_items());
            }
            Section::ImageTypes => {
                let entries = partial.types_of_images.get_or_insert_with(Vec::new);
                entries.extend(value.into_items().into_iter().map(|name| {
                    PartialImageCategory {
                        category_name: Some(name),
                        ..PartialImageCategory::default()
                    }
                }));
            }
            Section::Examples => {
                let entries = partial.types_of_images.get_or_insert_with(Vec::new);
                if entries.is_empty() {
                    entries.push(PartialImageCategory::default());
                }
                if let Some(last) = entries.last_mut() {
                    append_items(&mut last.examples, value.into_items());
                }
            }
            Section::NeuroTriggers => {
                append_items(&mut partial.neuro_triggers, value.into_items());
            }
            Section::VariationRules => {
                append_items(&mut partial.variation_rules, value.into_items());
            }
            Section::PromptingGuidance => {
                append_items(&mut partial.prompting_guidance, value.into_items());
            }
            Section::ProducerCamera => {
                partial
                    .producer_notes
                    .get_or_insert_with(Default::default)
                    .camera = Some(value.into_text());
            }
            Section::ProducerAngle => {
                partial
                    .producer_notes
                    .get_or_insert_with(Default::default)
                    .angle = Some(value.into_text());
            }
            Section::ProducerScene => {
                partial
                    .producer_notes
                    .get_or_insert_with(Default::default)
                    .scene = Some(value.into_text());
            }
        }
    }
    partial
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub max_retries: usize,
    pub retry_backoff: Duration,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub rules: VisualGuideRules,
    pub document: String,
    pub prompts: ImagePromptPair,
    pub attempts: usize,
    pub parse_mode: ParseMode,
    pub source_image_count: u64,
}

/// Sleep before retry `attempt + 1`: 1s, 2s, 4s with the default base.
pub fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    base * (1u32 << attempt.min(16))
}

/// Runs the full vision-to-guideline pipeline for one set of brand images.
///
/// Fetches all images concurrently (all-or-nothing), sends one combined
/// request to the vision model with sequential backoff retries, parses and
/// normalizes the response, and renders the locale-specific document plus
/// the downstream generation prompts. Event logging is best effort and
/// never fails the analysis.
pub fn analyze(
    model: &dyn VisionModel,
    fetcher: &dyn ImageFetcher,
    image_urls: &[String],
    locale: &str,
    brand_context: Option<&str>,
    options: &AnalyzeOptions,
    events: Option<&EventWriter>,
) -> std::result::Result<AnalysisOutcome, AnalysisError> {
    match analyze_inner(
        model,
        fetcher,
        image_urls,
        locale,
        brand_context,
        options,
        events,
    ) {
        Ok(outcome) => Ok(outcome),
        Err(error) => {
            emit(
                events,
                "analysis_failed",
                json!({ "error": error.to_string() }),
            );
            Err(error)
        }
    }
}

fn analyze_inner(
    model: &dyn VisionModel,
    fetcher: &dyn ImageFetcher,
    image_urls: &[String],
    locale: &str,
    brand_context: Option<&str>,
    options: &AnalyzeOptions,
    events: Option<&EventWriter>,
) -> std::result::Result<AnalysisOutcome, AnalysisError> {
    if image_urls.is_empty() {
        return Err(AnalysisError::permanent("no image references provided"));
    }
    emit(
        events,
        "analysis_started",
        json!({ "locale": locale, "image_count": image_urls.len() }),
    );

    let images = fetch_all(fetcher, image_urls)?;
    emit(events, "images_fetched", json!({ "count": images.len() }));

    let request = VisionRequest {
        prompt: build_analysis_prompt(locale, brand_context),
        image_data_urls: images.iter().map(FetchedImage::to_data_url).collect(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
    };
    let (raw, attempts) = invoke_with_retries(model, &request, options, events)?;

    let (partial, parse_mode) = parse_guideline_with_mode(&raw);
    if parse_mode == ParseMode::Heuristic {
        emit(
            events,
            "parse_fallback",
            json!({ "raw_chars": raw.chars().count() }),
        );
    }
    if partial.is_empty() {
        return Err(AnalysisError::Validation);
    }

    let rules = normalize(partial);
    let document = render_markdown(&rules, locale);
    let prompts = synthesize_prompts(&rules);
    emit(
        events,
        "analysis_completed",
        json!({ "attempts": attempts, "locale": locale }),
    );

    Ok(AnalysisOutcome {
        rules,
        document,
        prompts,
        attempts,
        parse_mode,
        source_image_count: image_urls.len() as u64,
    })
}

/// Scatter/gather download of every image. Any single failure rejects the
/// whole call; the model is never invoked on a partial set.
fn fetch_all(
    fetcher: &dyn ImageFetcher,
    urls: &[String],
) -> std::result::Result<Vec<FetchedImage>, AnalysisError> {
    let mut images = Vec::with_capacity(urls.len());
    let mut failure: Option<AnalysisError> = None;

    thread::scope(|scope| {
        let handles: Vec<_> = urls
            .iter()
            .map(|url| scope.spawn(move || fetcher.fetch(url)))
            .collect();
        for (handle, url) in handles.into_iter().zip(urls) {
            match handle.join() {
                Ok(Ok(image)) => images.push(image),
                Ok(Err(source)) => {
                    if failure.is_none() {
                        failure = Some(AnalysisError::ImageFetch {
                            url: url.clone(),
                            message: error_chain_text(&source, 400),
                        });
                    }
                }
                Err(_) => {
                    if failure.is_none() {
                        failure = Some(AnalysisError::ImageFetch {
                            url: url.clone(),
                            message: "image fetch worker panicked".to_string(),
                        });
                    }
                }
            }
        }
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(images),
    }
}

fn invoke_with_retries(
    model: &dyn VisionModel,
    request: &VisionRequest,
    options: &AnalyzeOptions,
    events: Option<&EventWriter>,
) -> std::result::Result<(String, usize), AnalysisError> {
    let mut last_error = AnalysisError::transient("vision model was never invoked");

    for attempt in 0..=options.max_retries {
        emit(
            events,
            "model_attempt",
            json!({ "attempt": attempt + 1, "model": model.name() }),
        );
        match model.complete(request) {
            Ok(content) if !content.trim().is_empty() => return Ok((content, attempt + 1)),
            Ok(_) => {
                last_error = AnalysisError::transient("vision model returned empty content");
            }
            Err(error) => {
                if error.kind() == ErrorKind::Permanent {
                    return Err(AnalysisError::Failed {
                        attempts: attempt + 1,
                        source: Box::new(error),
                    });
                }
                last_error = error;
            }
        }
        if attempt < options.max_retries {
            let delay = backoff_delay(options.retry_backoff, attempt);
            emit(
                events,
                "model_retry",
                json!({
                    "attempt": attempt + 1,
                    "delay_ms": delay.as_millis() as u64,
                    "cause": last_error.to_string(),
                }),
            );
            thread::sleep(delay);
        }
    }

    Err(AnalysisError::Failed {
        attempts: options.max_retries + 1,
        source: Box::new(last_error),
    })
}

fn emit(events: Option<&EventWriter>, event_type: &str, payload: Value) {
    if let Some(writer) = events {
        writer.emit_best_effort(event_type, map_object(payload));
    }
}

/// Request for the downstream image-generation service.
#[derive(Debug, Clone)]
pub struct ImageGenRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub count: u64,
}

impl ImageGenRequest {
    pub fn from_prompts(prompts: &ImagePromptPair, count: u64) -> Self {
        Self {
            prompt: prompts.base_prompt.clone(),
            negative_prompt: Some(prompts.negative_prompt.clone()),
            count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageGenResponse {
    pub images: Vec<GeneratedImage>,
    pub warnings: Vec<String>,
}

pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &ImageGenRequest) -> Result<ImageGenResponse>;
}

pub struct HttpImageGenerator {
    endpoint: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl HttpImageGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let Some(endpoint) = non_empty_env("BRANDBOOK_IMAGEGEN_ENDPOINT") else {
            bail!("BRANDBOOK_IMAGEGEN_ENDPOINT not set");
        };
        Ok(Self::new(
            endpoint,
            non_empty_env("BRANDBOOK_IMAGEGEN_API_KEY"),
        ))
    }
}

impl ImageGenerator for HttpImageGenerator {
    fn name(&self) -> &str {
        "http"
    }

    fn generate(&self, request: &ImageGenRequest) -> Result<ImageGenResponse> {
        let mut warnings = Vec::new();
        let count = clamp_image_count(request.count, &mut warnings);
        let mut payload = map_object(json!({
            "prompt": request.prompt,
            "count": count,
        }));
        if let Some(negative) = request
            .negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            payload.insert(
                "negativePrompt".to_string(),
                Value::String(negative.to_string()),
            );
        }

        let mut builder = self.http.post(&self.endpoint);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder
            .json(&Value::Object(payload))
            .send()
            .with_context(|| format!("image generation request failed ({})", self.endpoint))?;
        let payload = response_json_or_error("image generation", response)?;

        let images: Vec<GeneratedImage> = payload
            .get("images")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| {
                        let url = row.get("url").and_then(Value::as_str)?.to_string();
                        let storage_path = row
                            .get("storage_path")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        Some(GeneratedImage { url, storage_path })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if images.is_empty() {
            bail!("image generation response returned no images");
        }
        Ok(ImageGenResponse { images, warnings })
    }
}

fn clamp_image_count(count: u64, warnings: &mut Vec<String>) -> u64 {
    let clamped = count.clamp(1, MAX_IMAGES_PER_REQUEST);
    if clamped != count {
        warnings.push(format!(
            "image count {count} clamped to {clamped} (allowed 1..={MAX_IMAGES_PER_REQUEST})"
        ));
    }
    clamped
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn mime_for_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn response_json_or_error(what: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{what} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{what} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{what} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn is_retryable_transport_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map(|reqwest_err| {
                reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request()
            })
            .unwrap_or(false)
    })
}

fn is_retryable_status(code: u16) -> bool {
    code == 408 || code == 429 || code >= 500
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
