use crate::{Error, Wiki};
use glob::MatchOptions;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Pause taken between two consecutive pages.
pub trait Delay {
    fn pause(&self);
}

#[derive(Clone, Copy, Debug)]
pub struct FixedDelay(pub Duration);
impl Delay for FixedDelay {
    fn pause(&self) {
        if !self.0.is_zero() {
            debug!("Waiting {:?} before the next page", self.0);
            thread::sleep(self.0);
        }
    }
}

/// Scheme, host and port of `base` with the root path. This is where the
/// login form is posted.
pub fn auth_base_url(base: &Url) -> Result<Url, Error> {
    if base.cannot_be_a_base() || !base.has_host() {
        return Err(Error::InvalidBaseUrl(base.to_string()));
    }
    let mut url = base.clone();
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// A local file and the wiki page it replaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageTarget {
    pub path: PathBuf,
    pub name: String,
    pub url: Url,
}
impl PageTarget {
    /// The page name is the file name without its extension. It replaces the
    /// last path segment of `base`, so a base ending in `/` gains a segment.
    /// Stems `.` and `..` would resolve to a parent page and are rejected.
    pub fn for_file(base: &Url, path: &Path) -> Result<PageTarget, Error> {
        let name = path
            .file_stem()
            .and_then(OsStr::to_str)
            .filter(|name| !matches!(*name, "" | "." | ".."))
            .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| Error::InvalidBaseUrl(base.to_string()))?
            .pop()
            .push(name);
        Ok(PageTarget {
            path: path.to_owned(),
            name: name.to_owned(),
            url,
        })
    }
}

/// Files matching `pattern` in alphabetical order. Directories and other
/// non-file matches are skipped, and wildcards do not match a leading dot.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>, Error> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let mut files = Vec::new();
    for entry in glob::glob_with(pattern, options)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        } else {
            debug!("Skipping {}: not a file", path.display());
        }
    }
    Ok(files)
}

/// Page targets for every file matching `pattern`, without touching the wiki.
pub fn plan(pattern: &str, base: &Url) -> Result<Vec<PageTarget>, Error> {
    expand(pattern)?
        .iter()
        .map(|path| PageTarget::for_file(base, path))
        .collect()
}

#[derive(Debug, Default)]
pub struct Report {
    pub edited: Vec<Url>,
}

pub struct Importer<W, D> {
    wiki: W,
    delay: D,
}
impl<W: Wiki, D: Delay> Importer<W, D> {
    pub fn new(wiki: W, delay: D) -> Importer<W, D> {
        Importer { wiki, delay }
    }
    #[cfg(test)]
    fn wiki(&self) -> &W {
        &self.wiki
    }
    /// Logs in once, then replaces one page per matching file. The first
    /// failure stops the batch; pages already edited stay edited.
    pub fn run(
        &self, pattern: &str, base: &Url, username: &str, password: &str,
    ) -> Result<Report, Error> {
        let auth = auth_base_url(base)?;
        let session = self.wiki.login(&auth, username, password)?;
        let targets = plan(pattern, base)?;
        if targets.is_empty() {
            warn!("No files match {}", pattern);
        }
        let mut report = Report::default();
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                self.delay.pause();
            }
            debug!("Importing {} as {}", target.path.display(), target.name);
            let ticket = self.wiki.get_ticket(&target.url, &session)?;
            let text = fs::read_to_string(&target.path).map_err(|source| Error::Io {
                path: target.path.clone(),
                source,
            })?;
            self.wiki.edit_page(&target.url, &session, &text, &ticket)?;
            report.edited.push(target.url.clone());
        }
        info!("Imported {} page(s)", report.edited.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EditTicket, Session};
    use cookie::Cookie;
    use reqwest::StatusCode;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, PartialEq)]
    enum Call {
        Login(String),
        Ticket(String),
        Edit { url: String, text: String, ticket: String, session: Option<String> },
    }

    #[derive(Default)]
    struct FakeWiki {
        calls: RefCell<Vec<Call>>,
        reject_login: bool,
        malformed_page: Option<&'static str>,
        failing_edit: Option<&'static str>,
        tickets: Cell<u32>,
    }
    impl Wiki for FakeWiki {
        fn login(&self, url: &Url, _: &str, _: &str) -> Result<Session, Error> {
            self.calls.borrow_mut().push(Call::Login(url.to_string()));
            if self.reject_login {
                return Err(Error::Authentication { url: url.clone(), status: StatusCode::FORBIDDEN });
            }
            Ok(Session::from_cookies([Cookie::new("MOIN_SESSION", "s1")]))
        }
        fn get_ticket(&self, page: &Url, _: &Session) -> Result<EditTicket, Error> {
            self.calls.borrow_mut().push(Call::Ticket(page.to_string()));
            if self.malformed_page.is_some_and(|name| page.path().ends_with(name)) {
                return Err(Error::MalformedResponse { url: page.clone(), field: "ticket" });
            }
            let n = self.tickets.get() + 1;
            self.tickets.set(n);
            Ok(EditTicket { ticket: format!("t{}", n), rev: "1".into() })
        }
        fn edit_page(
            &self, page: &Url, session: &Session, text: &str, ticket: &EditTicket,
        ) -> Result<(), Error> {
            self.calls.borrow_mut().push(Call::Edit {
                url: page.to_string(),
                text: text.into(),
                ticket: ticket.ticket.clone(),
                session: session.header(),
            });
            if self.failing_edit.is_some_and(|name| page.path().ends_with(name)) {
                // reqwest errors cannot be built by hand
                return Err(Error::Io {
                    path: PathBuf::from(page.path()),
                    source: std::io::Error::other("edit rejected"),
                });
            }
            Ok(())
        }
    }

    struct CountingDelay(Cell<u32>);
    impl Delay for CountingDelay {
        fn pause(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn workdir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            fs::write(dir.path().join(name), text).unwrap();
        }
        dir
    }

    fn pattern(dir: &tempfile::TempDir, glob: &str) -> String {
        dir.path().join(glob).to_str().unwrap().to_owned()
    }

    fn base() -> Url {
        Url::parse("https://wiki.example.com/QM/test/").unwrap()
    }

    #[test]
    fn auth_url_drops_path_query_and_fragment() {
        let url = Url::parse("https://wiki.example.com/QM/test/?x=1#top").unwrap();
        assert_eq!(auth_base_url(&url).unwrap().as_str(), "https://wiki.example.com/");
        let url = Url::parse("http://localhost:8080/Some/Page").unwrap();
        assert_eq!(auth_base_url(&url).unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn auth_url_needs_a_host() {
        let url = Url::parse("mailto:wiki@example.com").unwrap();
        assert!(matches!(auth_base_url(&url), Err(Error::InvalidBaseUrl(_))));
    }

    #[test]
    fn page_name_is_the_file_stem() {
        let target = PageTarget::for_file(&base(), Path::new("docs/devcons.md")).unwrap();
        assert_eq!(target.name, "devcons");
        assert_eq!(target.url.as_str(), "https://wiki.example.com/QM/test/devcons");
    }

    #[test]
    fn base_without_trailing_slash_replaces_last_segment() {
        let base = Url::parse("https://wiki.example.com/QM/test?x=1").unwrap();
        let target = PageTarget::for_file(&base, Path::new("devcons.md")).unwrap();
        assert_eq!(target.url.as_str(), "https://wiki.example.com/QM/devcons");
    }

    #[test]
    fn page_names_are_escaped_as_one_segment() {
        let target = PageTarget::for_file(&base(), Path::new("Release Notes?.txt")).unwrap();
        assert_eq!(target.url.as_str(), "https://wiki.example.com/QM/test/Release%20Notes%3F");
        let target = PageTarget::for_file(&base(), Path::new("Help:Index.txt")).unwrap();
        assert_eq!(target.url.as_str(), "https://wiki.example.com/QM/test/Help:Index");
    }

    #[test]
    fn dot_stems_cannot_reach_the_parent_page() {
        for file in ["..txt", "...txt", "docs/.."] {
            assert!(matches!(
                PageTarget::for_file(&base(), Path::new(file)),
                Err(Error::InvalidFileName(_))
            ));
        }
        let target = PageTarget::for_file(&base(), Path::new("....txt")).unwrap();
        assert_eq!(target.url.as_str(), "https://wiki.example.com/QM/test/...");
    }

    #[test]
    fn same_stem_targets_same_page() {
        let a = PageTarget::for_file(&base(), Path::new("notes.md")).unwrap();
        let b = PageTarget::for_file(&base(), Path::new("notes.txt")).unwrap();
        assert_eq!(a.url, b.url);
    }

    #[test]
    fn expand_sorts_and_skips_directories() {
        let dir = workdir(&[
            ("b.txt", "B"),
            ("a.txt", "A"),
            ("c.md", "C"),
            (".draft.txt", "D"),
        ]);
        fs::create_dir(dir.path().join("d.txt")).unwrap();
        let files = expand(&pattern(&dir, "*.txt")).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }

    #[test]
    fn dotfiles_match_only_a_literal_dot() {
        let dir = workdir(&[(".draft.txt", "D"), ("a.txt", "A")]);
        let files = expand(&pattern(&dir, ".*.txt")).unwrap();
        assert_eq!(files, [dir.path().join(".draft.txt")]);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(matches!(expand("[*.txt"), Err(Error::Pattern(_))));
    }

    #[test]
    fn imports_every_file_in_order() {
        let dir = workdir(&[("b.txt", "= B =\n"), ("a.txt", "= A =\n")]);
        let importer = Importer::new(FakeWiki::default(), CountingDelay(Cell::new(0)));
        let report = importer.run(&pattern(&dir, "*.txt"), &base(), "alice", "pw").unwrap();
        assert_eq!(report.edited.len(), 2);
        let session = Some("MOIN_SESSION=s1".to_owned());
        assert_eq!(
            *importer.wiki().calls.borrow(),
            [
                Call::Login("https://wiki.example.com/".into()),
                Call::Ticket("https://wiki.example.com/QM/test/a".into()),
                Call::Edit {
                    url: "https://wiki.example.com/QM/test/a".into(),
                    text: "= A =\n".into(),
                    ticket: "t1".into(),
                    session: session.clone(),
                },
                Call::Ticket("https://wiki.example.com/QM/test/b".into()),
                Call::Edit {
                    url: "https://wiki.example.com/QM/test/b".into(),
                    text: "= B =\n".into(),
                    ticket: "t2".into(),
                    session,
                },
            ]
        );
        assert_eq!(importer.delay.0.get(), 1);
    }

    #[test]
    fn rejected_login_stops_before_any_page() {
        let dir = workdir(&[("a.txt", "A")]);
        let wiki = FakeWiki { reject_login: true, ..FakeWiki::default() };
        let importer = Importer::new(wiki, FixedDelay(Duration::ZERO));
        let err = importer.run(&pattern(&dir, "*.txt"), &base(), "alice", "bad").unwrap_err();
        assert!(matches!(err, Error::Authentication { status, .. } if status == StatusCode::FORBIDDEN));
        assert_eq!(importer.wiki().calls.borrow().len(), 1);
    }

    #[test]
    fn malformed_edit_form_stops_without_posting() {
        let dir = workdir(&[("a.txt", "A"), ("b.txt", "B")]);
        let wiki = FakeWiki { malformed_page: Some("/a"), ..FakeWiki::default() };
        let importer = Importer::new(wiki, FixedDelay(Duration::ZERO));
        let err = importer.run(&pattern(&dir, "*.txt"), &base(), "alice", "pw").unwrap_err();
        assert!(err.is_critical());
        let calls = importer.wiki().calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(!calls.iter().any(|call| matches!(call, Call::Edit { .. })));
    }

    #[test]
    fn failed_edit_halts_the_rest_of_the_batch() {
        let dir = workdir(&[("a.txt", "A"), ("b.txt", "B"), ("c.txt", "C")]);
        let wiki = FakeWiki { failing_edit: Some("/b"), ..FakeWiki::default() };
        let importer = Importer::new(wiki, FixedDelay(Duration::ZERO));
        let err = importer.run(&pattern(&dir, "*.txt"), &base(), "alice", "pw").unwrap_err();
        assert!(!err.is_critical());
        let calls = importer.wiki().calls.borrow();
        assert!(!calls.iter().any(|call| matches!(call, Call::Ticket(url) if url.ends_with("/c"))));
        assert_eq!(calls.len(), 5);
    }

    #[test]
    fn no_matches_still_logs_in_and_succeeds() {
        let dir = workdir(&[]);
        let importer = Importer::new(FakeWiki::default(), FixedDelay(Duration::ZERO));
        let report = importer.run(&pattern(&dir, "*.txt"), &base(), "alice", "pw").unwrap();
        assert!(report.edited.is_empty());
        assert_eq!(importer.wiki().calls.borrow().len(), 1);
    }

    #[test]
    fn rerun_repeats_the_same_requests() {
        let dir = workdir(&[("a.txt", "A"), ("b.txt", "B")]);
        let first = Importer::new(FakeWiki::default(), FixedDelay(Duration::ZERO));
        let second = Importer::new(FakeWiki::default(), FixedDelay(Duration::ZERO));
        first.run(&pattern(&dir, "*.txt"), &base(), "alice", "pw").unwrap();
        second.run(&pattern(&dir, "*.txt"), &base(), "alice", "pw").unwrap();
        assert_eq!(*first.wiki().calls.borrow(), *second.wiki().calls.borrow());
    }
}
