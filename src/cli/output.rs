//! CLI output formatting utilities

use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Show only the last four characters of a secret
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

pub fn print_config(config: &AppConfig) {
    println!("📋 barcraft Configuration:");
    println!();

    println!("🌐 Server:");
    println!("  Address: {}:{}", config.server.host, config.server.port);
    println!("  CORS: {}", config.server.enable_cors);
    println!("  Session cookie: {}", config.server.cookie_name);
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🤖 LLM:");
    println!("  Provider: {:?}", config.llm.provider);
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!("  Key: {}", mask_secret(config.llm_key()));
    println!("  Timeout: {}s", config.llm.timeout_secs);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {:?}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("📚 Knowledge:");
    println!("  Index: {}", config.index_path().display());
    println!("  Label: {}", config.knowledge.label);
    println!("  Top k: {}", config.top_k());
    println!(
        "  Chunking: {} chars, {} overlap",
        config.knowledge.chunk_size, config.knowledge.chunk_overlap
    );
    println!();

    println!("💬 Sessions:");
    println!("  Backend: {:?}", config.sessions.backend);
    println!("  Directory: {}", config.sessions.dir.display());
    println!("  TTL: {}s", config.session_ttl_secs());
    match config.prompt.history_char_budget {
        Some(budget) => println!("  History budget: {budget} chars"),
        None => println!("  History budget: unlimited"),
    }
    println!();

    println!("📄 Export:");
    println!("  Title: {}", config.export.document_title);
    println!("  File: {}", config.export.file_name);
    match &config.smtp {
        Some(smtp) => {
            println!("  SMTP: {}:{} as {}", smtp.server, smtp.port, smtp.username);
            println!("  SMTP password: {}", mask_secret(&smtp.password));
        }
        None => println!("  SMTP: disabled"),
    }
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}
