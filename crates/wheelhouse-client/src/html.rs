use tl::HTMLTag;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    #[error(transparent)]
    HtmlParse(#[from] tl::ParseError),

    #[error("Failed to parse URL: {0}")]
    UrlParse(String, #[source] url::ParseError),

    #[error("Unsupported filename in URL: {0}")]
    UnsupportedFilename(String),
}

/// A link to a distribution file, as found on an HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlFile {
    /// The unquoted filename, taken from the last path segment of the URL.
    pub filename: String,
    /// The absolute URL of the file, without its fragment.
    pub url: Url,
}

/// The links found on a PEP 503 simple index page or a `--find-links` HTML page.
#[derive(Debug, Clone)]
pub struct SimpleHtml {
    /// The URL to which all relative URLs were resolved.
    pub base: Url,
    /// The files linked from the page, sorted by filename.
    pub files: Vec<HtmlFile>,
}

impl SimpleHtml {
    /// Parse the list of [`HtmlFile`]s from the HTML page returned by the given URL.
    #[instrument(skip_all, fields(url = % url))]
    pub fn parse(text: &str, url: &Url) -> Result<Self, Error> {
        let dom = tl::parse(text, tl::ParserOptions::default())?;

        // Parse the first `<base>` tag, if any, to determine the base URL to which all
        // relative URLs should be resolved. The HTML spec requires that the `<base>` tag
        // appear before other tags with attribute values of URLs.
        let base = dom
            .nodes()
            .iter()
            .filter_map(|node| node.as_tag())
            .take_while(|tag| !matches!(tag.name().as_bytes(), b"a" | b"link"))
            .find(|tag| tag.name().as_bytes() == b"base")
            .map(|base| Self::parse_base(base, url))
            .transpose()?
            .flatten()
            .unwrap_or_else(|| url.clone());

        let mut files = dom
            .nodes()
            .iter()
            .filter_map(|node| node.as_tag())
            .filter(|link| link.name().as_bytes() == b"a")
            .map(|link| Self::parse_anchor(link, &base))
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>, _>>()?;
        files.sort_unstable_by(|a, b| a.filename.cmp(&b.filename));

        Ok(Self { base, files })
    }

    /// Parse the `href` from a `<base>` tag.
    fn parse_base(base: &HTMLTag, url: &Url) -> Result<Option<Url>, Error> {
        let Some(Some(href)) = base.attributes().get("href") else {
            return Ok(None);
        };
        let href = std::str::from_utf8(href.as_bytes())?;
        let href = html_escape::decode_html_entities(href);
        let base = url
            .join(&href)
            .map_err(|err| Error::UrlParse(href.to_string(), err))?;
        Ok(Some(base))
    }

    /// Parse an [`HtmlFile`] from an `<a>` tag.
    ///
    /// Returns `None` if the `<a>` tag doesn't have a non-empty `href` attribute.
    fn parse_anchor(link: &HTMLTag, base: &Url) -> Result<Option<HtmlFile>, Error> {
        let Some(href) = link
            .attributes()
            .get("href")
            .flatten()
            .filter(|bytes| !bytes.as_bytes().is_empty())
        else {
            return Ok(None);
        };
        let href = std::str::from_utf8(href.as_bytes())?;
        let decoded = html_escape::decode_html_entities(href);

        // Drop the fragment, e.g., `#sha256=...`.
        let path = decoded
            .split_once('#')
            .map_or(decoded.as_ref(), |(path, _fragment)| path);

        let mut url = base
            .join(path)
            .map_err(|err| Error::UrlParse(path.to_string(), err))?;
        url.set_fragment(None);

        // The filename is the final path component of the URL. Links to directories (e.g., a
        // link back to the parent page) don't name a file.
        let Some(filename) = url
            .path_segments()
            .and_then(Iterator::last)
            .filter(|filename| !filename.is_empty())
        else {
            debug!("Ignoring link without a filename: {href}");
            return Ok(None);
        };
        let filename = percent_encoding::percent_decode_str(filename)
            .decode_utf8()
            .map_err(|_| Error::UnsupportedFilename(filename.to_string()))?
            .into_owned();

        Ok(Some(HtmlFile { filename, url }))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn filenames(html: &SimpleHtml) -> Vec<(&str, &str)> {
        html.files
            .iter()
            .map(|file| (file.filename.as_str(), file.url.as_str()))
            .collect()
    }

    #[test]
    fn parse_simple_index() {
        let text = indoc! {r#"
            <!DOCTYPE html>
            <html>
              <body>
                <h1>Links for colander</h1>
                <a href="https://files.example.com/packages/colander-0.9.9-py2.py3-none-any.whl#sha256=7389413266b9e680c9529c16d56284edf87e0d5de557948e75f41d65683c23b3">colander-0.9.9-py2.py3-none-any.whl</a><br/>
                <a href="../../packages/colander-0.9.9.tar.gz">colander-0.9.9.tar.gz</a><br/>
                <a>no href</a>
              </body>
            </html>
        "#};
        let base = Url::parse("https://index.example.com/simple/colander/").unwrap();
        let html = SimpleHtml::parse(text, &base).unwrap();
        insta::assert_debug_snapshot!(filenames(&html), @r#"
        [
            (
                "colander-0.9.9-py2.py3-none-any.whl",
                "https://files.example.com/packages/colander-0.9.9-py2.py3-none-any.whl",
            ),
            (
                "colander-0.9.9.tar.gz",
                "https://index.example.com/packages/colander-0.9.9.tar.gz",
            ),
        ]
        "#);
    }

    #[test]
    fn parse_base_tag() {
        let text = indoc! {r#"
            <html>
              <head><base href="https://mirror.example.com/files/"></head>
              <body>
                <a href="fake-1.0-py2.py3-none-any.whl">fake-1.0-py2.py3-none-any.whl</a>
              </body>
            </html>
        "#};
        let base = Url::parse("https://index.example.com/links.html").unwrap();
        let html = SimpleHtml::parse(text, &base).unwrap();
        assert_eq!(html.base.as_str(), "https://mirror.example.com/files/");
        assert_eq!(
            filenames(&html),
            [(
                "fake-1.0-py2.py3-none-any.whl",
                "https://mirror.example.com/files/fake-1.0-py2.py3-none-any.whl"
            )]
        );
    }

    #[test]
    fn parse_escaped_href() {
        let text = r#"<a href="/packages/Jinja2%2D3.1.2%2Dpy3%2Dnone%2Dany.whl?query=1&amp;x=2#md5=abc">link</a>"#;
        let base = Url::parse("https://index.example.com/simple/jinja2/").unwrap();
        let html = SimpleHtml::parse(text, &base).unwrap();
        assert_eq!(html.files[0].filename, "Jinja2-3.1.2-py3-none-any.whl");
        assert_eq!(
            html.files[0].url.as_str(),
            "https://index.example.com/packages/Jinja2%2D3.1.2%2Dpy3%2Dnone%2Dany.whl?query=1&x=2"
        );
    }

    #[test]
    fn directory_links_are_ignored() {
        let text = r#"<a href="../">parent</a><a href="https://index.example.com/simple/">index</a>"#;
        let base = Url::parse("https://index.example.com/simple/fake/").unwrap();
        let html = SimpleHtml::parse(text, &base).unwrap();
        assert!(html.files.is_empty());
    }
}
