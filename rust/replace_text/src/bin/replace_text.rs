use anyhow::{anyhow, Context, Result};
use clap::Parser;
use replace_text::{load_rules, Document, ReplacementRequest, Search};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input HTML file.
    #[arg(long)]
    html_file: PathBuf,

    /// Output path (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Elements whose text children are rewritten. Repeatable.
    #[arg(long = "tag", default_value = "body")]
    tags: Vec<String>,

    /// Substring, or pattern source with --regex.
    #[arg(long, requires = "replace")]
    search: Option<String>,

    /// Replacement text; supports $&, $1, $<name> and friends.
    #[arg(long, requires = "search")]
    replace: Option<String>,

    /// Treat --search as a regular expression.
    #[arg(long)]
    regex: bool,

    /// Pattern flags for --regex (g, i, m, s, u).
    #[arg(long, default_value = "")]
    flags: String,

    /// Write the replacement as text even when it contains markup.
    #[arg(long)]
    text_only: bool,

    /// JSON rules file, applied after the command-line replacement.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Emit only the inner HTML of <body>.
    #[arg(long)]
    fragment: bool,
}

fn command_line_request(args: &Args) -> Result<Option<ReplacementRequest>> {
    let (Some(search), Some(replace)) = (&args.search, &args.replace) else {
        return Ok(None);
    };
    let search = if args.regex {
        Search::regex(search, &args.flags).context("compile --search pattern")?
    } else {
        Search::literal(search.as_str())
    };
    Ok(Some(ReplacementRequest::new(
        search,
        replace.as_str(),
        args.text_only,
    )))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut html = String::new();
    File::open(&args.html_file)
        .with_context(|| format!("open {}", args.html_file.display()))?
        .read_to_string(&mut html)
        .context("read html")?;

    let request = command_line_request(&args)?;
    let rules = match &args.rules {
        Some(path) => {
            load_rules(path).with_context(|| format!("load rules {}", path.display()))?
        }
        None => Vec::new(),
    };
    if request.is_none() && rules.is_empty() {
        return Err(anyhow!("nothing to do: pass --search/--replace or --rules"));
    }

    let doc = Document::parse(&html);

    if let Some(request) = &request {
        for tag in &args.tags {
            let selection = doc.select(tag);
            debug!(tag = %tag, elements = selection.len(), "applying command-line replacement");
            request.apply(selection.as_slice());
        }
    }

    for (i, rule) in rules.iter().enumerate() {
        let request = ReplacementRequest::try_from(rule)
            .with_context(|| format!("rule #{i} ({:?})", rule.search))?;
        let selection = doc.select(&rule.tag);
        debug!(rule = i, tag = %rule.tag, elements = selection.len(), "applying rule");
        request.apply(selection.as_slice());
    }

    let output = if args.fragment {
        doc.body_html()
    } else {
        doc.to_html()
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, &output).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), bytes = output.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes()).context("write stdout")?;
            stdout.flush().context("flush stdout")?;
        }
    }
    Ok(())
}
