use comrak::{ComrakOptions, ComrakRenderOptions, ListStyleType};

/// GitHub-flavoured markdown: tables, autolinks, strikethrough and task
/// lists. Raw HTML in notes is passed through but dangerous tags are
/// filtered.
pub fn make_comrak_options() -> ComrakOptions {
    let mut comrak_options = ComrakOptions::default();
    comrak_options.extension.table = true;
    comrak_options.extension.autolink = true;
    comrak_options.extension.tagfilter = true;
    comrak_options.extension.strikethrough = true;
    comrak_options.extension.tasklist = true;
    comrak_options.parse.smart = true;
    let mut render_options = ComrakRenderOptions::default();
    render_options.unsafe_ = true;
    render_options.list_style = ListStyleType::Dash;
    comrak_options.render = render_options;
    comrak_options
}

pub fn render_markdown(markdown: &str, options: &ComrakOptions) -> String {
    comrak::markdown_to_html(markdown, options)
}

/// Path segments of `path` below `prefix`, e.g. `["life", "sleep.md"]`.
pub fn breadcrumb(path: &str, prefix: &str) -> Vec<String> {
    let relative = path.strip_prefix(prefix).unwrap_or(path);
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gfm_extensions() {
        let options = make_comrak_options();
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~\n\n- [x] done\n", &options);
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn fenced_code_keeps_language() {
        let html = render_markdown("```rust\nfn main() {}\n```\n", &make_comrak_options());
        assert!(html.contains("language-rust"));
    }

    #[test]
    fn filters_script_tags() {
        let html = render_markdown("<script>alert(1)</script>\n", &make_comrak_options());
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn breadcrumb_drops_prefix() {
        assert_eq!(breadcrumb("notes/life/sleep.md", "notes/"), vec!["life", "sleep.md"]);
        assert_eq!(breadcrumb("other/x.md", "notes/"), vec!["other", "x.md"]);
    }
}
