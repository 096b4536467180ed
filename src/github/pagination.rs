// src/github/pagination.rs
// =============================================================================
// Link-header pagination for the search endpoint.
//
// GitHub sends pagination as an RFC 5988 style header:
//   <https://api.github.com/search/repositories?q=...&page=2>; rel="next",
//   <https://api.github.com/search/repositories?q=...&page=5>; rel="last"
//
// The crawl keeps going while a "next" relation exists and moves to the page
// it names. The "last" page number only shows up in the page trace.
// =============================================================================

use reqwest::header::{HeaderMap, LINK};

// Relations parsed out of a Link header
//
// Only "next" and "last" matter to the crawler; "prev" and "first" are
// skipped while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// Page number carried by the rel="next" URL, if it has one
    pub next_page: Option<u32>,
    /// Page number carried by the rel="last" URL (shown in the page trace)
    pub last_page: Option<u32>,
    /// Whether a `rel="next"` entry was present at all, even one whose URL
    /// carries no readable page number.
    pub has_next: bool,
}

// Parses a whole Link header value
//
// The header is a comma separated list of entries, each one shaped like
//   <URL>; rel="a b"
// Anything that does not fit this shape is ignored rather than rejected:
// a broken header simply means "no more pages".
pub fn parse_link_header(header: &str) -> LinkPagination {
    let mut links = LinkPagination::default();

    for entry in header.split(',') {
        let mut target = None;  // the <URL> part of this entry
        let mut rels = Vec::new();

        for segment in entry.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                target = Some(inner);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                // rel may hold several space separated relation types
                rels.extend(value.trim_matches('"').split_whitespace());
            }
        }

        // An entry without a URL carries nothing we can use
        let Some(target) = target else { continue };
        let page = page_number(target);
        for rel in rels {
            match rel {
                "next" => {
                    links.has_next = true;
                    links.next_page = page;
                }
                "last" => links.last_page = page,
                _ => {}  // prev, first, ...
            }
        }
    }

    links
}

// Reads the `page` query parameter of a pagination URL
//
// query_pairs() percent-decodes keys and values, so `page=2` is found even
// when the rest of the query string is encoded.
fn page_number(target: &str) -> Option<u32> {
    let url = url::Url::parse(target).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Where the paging loop stands. Scoped to one crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,      // page to request next
    pub has_more: bool, // false once a page came back without rel="next"
}

impl PageCursor {
    pub fn first() -> Self {
        Self {
            page: 1,
            has_more: true,
        }
    }

    /// Moves past the current page using the response headers. A response
    /// without a Link header, or without a "next" relation, is the last page.
    ///
    /// The next page is the one named by rel="next" when it lies ahead of the
    /// current page, otherwise simply the following page number. Returns the
    /// parsed relations so the caller can report them.
    pub fn advance(&mut self, headers: &HeaderMap) -> LinkPagination {
        let links = headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        self.has_more = links.has_next;
        if self.has_more {
            // Never step backwards or stand still, whatever the header says
            self.page = links
                .next_page
                .filter(|next| *next > self.page)
                .unwrap_or(self.page + 1);
        }
        links
    }
}
