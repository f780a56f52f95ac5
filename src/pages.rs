use horrorshow::helper::doctype;
use horrorshow::prelude::*;

use crate::record::ConversionRecord;
use crate::store::Listing;

/// The basic HTML of our pages, the `<head>` with our CSS and the `<body>` with our script.
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        "{}",
        html! {
            : doctype::HTML;
            html {
                head {
                    meta(charset="utf-8");
                    title : title;
                    link(rel="stylesheet", href="/static/style.css");
                }
                body {
                    : Raw(content);
                    script(src="/static/app.js");
                }
            }
        }
    )
}

/// The converter form: markdown in, plain text out.
pub fn index_html() -> String {
    format!(
        "{}",
        html! {
            div(class="page") {
                h1 : "Markdown to plain text";
                p(class="lead") : "Paste some Markdown or open a .md file, then convert it to plain text.";
                form(id="convert-form") {
                    label(class="button", for="markdown-file") {
                        : "Open a Markdown file";
                        input(id="markdown-file", class="hidden", type="file", accept=".md,.markdown");
                    }
                    textarea(id="markdown-input", placeholder="Paste your Markdown here or drop a file on it...");
                    div(class="controls") {
                        label(for="remove-empty-lines") {
                            input(id="remove-empty-lines", type="checkbox");
                            : " Remove empty lines";
                        }
                        button(id="convert-button", class="primary", type="submit") : "Convert to plain text";
                    }
                }
                p(id="error", class="error");
                div(id="result", class="result hidden") {
                    label(for="text-output") : "Plain text";
                    textarea(id="text-output", readonly="readonly");
                    div(class="actions") {
                        button(id="download-button", type="button") : "Download .txt";
                        button(id="copy-button", type="button") : "Copy to clipboard";
                    }
                }
            }
        }
    )
}

/// The history of conversions with a count on top.
pub fn admin_html(listing: &Listing) -> String {
    format!(
        "{}",
        html! {
            div(class="page admin") {
                div(class="admin-header") {
                    h1 : "Conversion history";
                    div(class="total") : total_label(listing.total);
                }
                @ if listing.records.is_empty() {
                    div(class="empty") : "No conversions yet";
                } else {
                    table(class="records") {
                        thead {
                            tr {
                                th : "Time";
                                th : "Source";
                                th : "Markdown length";
                                th : "Text length";
                                th : "Options";
                                th : "Sample";
                                th : "Details";
                            }
                        }
                        tbody {
                            @ for (idx, record) in listing.records.iter().enumerate() {
                                : Raw(record_row(idx, record));
                            }
                        }
                    }
                }
            }
        }
    )
}

fn total_label(total: usize) -> String {
    if total == 1 {
        "1 record".to_string()
    } else {
        format!("{} records", total)
    }
}

/// One row of the history table, with an expandable panel holding the full texts.
fn record_row(idx: usize, record: &ConversionRecord) -> String {
    let converted_id = format!("converted-{}", idx);
    let original_id = format!("original-{}", idx);

    format!(
        "{}",
        html! {
            tr {
                td(class="timestamp") : record.timestamp.as_str();
                td : record.filename.as_str();
                td : record.markdown_length.to_string();
                td : record.text_length.to_string();
                td {
                    @ if record.options.remove_empty_lines {
                        span(class="badge") : "Empty lines removed";
                    }
                }
                td(class="sample") : record.sample.as_str();
                td {
                    details {
                        summary : "Show";
                        div(class="panel") {
                            h4 : "Converted text";
                            textarea(id=converted_id.as_str(), readonly="readonly") : record.full_text.as_str();
                            div(class="actions") {
                                button(class="copy", type="button", value=converted_id.as_str()) : "Copy";
                                a(href=download_href(record, "converted")) : "Download";
                            }
                            h4 : "Original Markdown";
                            textarea(id=original_id.as_str(), readonly="readonly") : record.original_markdown.as_str();
                            div(class="actions") {
                                button(class="copy", type="button", value=original_id.as_str()) : "Copy";
                                a(href=download_href(record, "original")) : "Download";
                            }
                        }
                    }
                }
            }
        }
    )
}

fn download_href(record: &ConversionRecord, content: &str) -> String {
    format!(
        "/admin/download?timestamp={}&content={}",
        record.timestamp.replace('+', "%2B"),
        content
    )
}
