use std::io::{BufRead, Write};

use owo_colors::OwoColorize;
use tracing::debug;

use crate::{
    catalog::TitleProbe,
    prompt::ask,
    result::{Error, Result},
    types::{FormatCatalog, FormatOption},
};

/// Outcome of the selection for one video
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected(FormatOption),
    Skipped,
    /// Stop the whole run
    Exited,
}

/// One parsed line of operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    /// 0-based position in the catalog
    Index(usize),
    Best,
    Skip,
    Info,
    TryAlternative,
    Quit,
    OutOfRange,
    Invalid,
}

fn parse_choice(line: &str, count: usize) -> Choice {
    match line.trim().to_lowercase().as_str() {
        "b" => Choice::Best,
        "s" => Choice::Skip,
        "i" => Choice::Info,
        "t" => Choice::TryAlternative,
        "q" => Choice::Quit,
        other => match other.parse::<i64>() {
            Ok(n) if n >= 1 && n as u64 <= count as u64 => Choice::Index(n as usize - 1),
            Ok(_) => Choice::OutOfRange,
            Err(_) => Choice::Invalid,
        },
    }
}

/// Asks the operator which format to download, one video at a time.
pub struct Selector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Selector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// The console the selector writes to, shared with the rest of the run
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Present the catalog and wait for a decision.
    ///
    /// Unrecognized answers are corrected and asked again, as many times as needed.
    /// A closed input counts as a request to quit.
    pub fn select(
        &mut self,
        catalog: &FormatCatalog,
        index: usize,
        total: usize,
        probe: &dyn TitleProbe,
    ) -> Result<Selection> {
        let rule = "=".repeat(60);
        writeln!(self.output, "\n{rule}")?;
        writeln!(self.output, "Video {index}/{total}: {}", catalog.title.bold())?;
        writeln!(self.output, "URL: {}", catalog.link)?;
        writeln!(self.output, "{rule}")?;

        let res = if catalog.is_empty() {
            self.select_without_formats(catalog, probe)
        } else {
            self.select_format(catalog)
        };

        match res {
            Err(Error::InputClosed) => {
                debug!("Input closed, stopping");
                Ok(Selection::Exited)
            }
            res => res,
        }
    }

    fn select_without_formats(
        &mut self,
        catalog: &FormatCatalog,
        probe: &dyn TitleProbe,
    ) -> Result<Selection> {
        writeln!(self.output, "{}", "No video formats found!".red())?;
        writeln!(self.output, "Possible reasons:")?;
        writeln!(self.output, "1. Video is private or requires login")?;
        writeln!(self.output, "2. Video is not available in your region")?;
        writeln!(self.output, "3. Website structure has changed")?;

        loop {
            let line = self.ask("\nWhat would you like to do? (s=skip, t=try alternative, q=quit): ")?;
            match parse_choice(&line, 0) {
                Choice::Skip => return Ok(Selection::Skipped),
                Choice::Quit => return Ok(Selection::Exited),
                Choice::TryAlternative => {
                    writeln!(self.output, "Trying alternative method...")?;
                    match probe.probe_title(&catalog.link) {
                        Some(title) => writeln!(self.output, "Page title: {title}")?,
                        None => writeln!(self.output, "Nothing could be read from the page")?,
                    }
                    // A page title alone does not give anything to download
                    writeln!(self.output, "No downloadable format, skipping this video")?;
                    return Ok(Selection::Skipped);
                }
                _ => writeln!(self.output, "Please enter one of the letters (s,t,q)")?,
            }
        }
    }

    fn select_format(&mut self, catalog: &FormatCatalog) -> Result<Selection> {
        let formats = &catalog.formats;
        self.print_table(formats)?;

        let prompt = format!(
            "\nSelect format (1-{}, b=best, s=skip, i=info, q=quit): ",
            formats.len()
        );
        loop {
            let line = self.ask(&prompt)?;
            match parse_choice(&line, formats.len()) {
                Choice::Index(i) => {
                    let selected = &formats[i];
                    writeln!(
                        self.output,
                        "Selected: {} (ID: {})",
                        selected.quality.green(),
                        selected.format_id
                    )?;
                    return Ok(Selection::Selected(selected.clone()));
                }
                Choice::Best => {
                    if let Some(best) = catalog.best() {
                        writeln!(
                            self.output,
                            "Selected: Best quality ({})",
                            best.quality.green()
                        )?;
                        return Ok(Selection::Selected(best.clone()));
                    }
                }
                Choice::Skip => {
                    writeln!(self.output, "Skipping this video")?;
                    return Ok(Selection::Skipped);
                }
                Choice::Quit => return Ok(Selection::Exited),
                Choice::Info => self.print_details(formats)?,
                Choice::OutOfRange => writeln!(
                    self.output,
                    "Please enter a number between 1 and {}",
                    formats.len()
                )?,
                Choice::TryAlternative | Choice::Invalid => writeln!(
                    self.output,
                    "Invalid input. Please enter a number or one of the letters (b,s,i,q)"
                )?,
            }
        }
    }

    fn print_table(&mut self, formats: &[FormatOption]) -> Result<()> {
        let rule = "-".repeat(80);
        writeln!(self.output, "\nAvailable formats ({} options):", formats.len())?;
        writeln!(self.output, "{rule}")?;
        writeln!(
            self.output,
            "{:<4} {:<10} {:<12} {:<8} {:<10} {:<6} {:<10}",
            "No.", "Quality", "Resolution", "Format", "Size", "FPS", "ID"
        )?;
        writeln!(self.output, "{rule}")?;

        for (i, f) in formats.iter().enumerate() {
            let id: String = f.format_id.chars().take(15).collect();
            writeln!(
                self.output,
                "{:<4} {:<10} {:<12} {:<8} {:<10} {:<6} {:<10}",
                i + 1,
                f.quality.to_string(),
                f.resolution(),
                f.ext,
                format!("{:.1}", f.size),
                f.fps_label(),
                id
            )?;
        }

        writeln!(self.output, "{rule}")?;
        Ok(())
    }

    fn print_details(&mut self, formats: &[FormatOption]) -> Result<()> {
        writeln!(self.output, "\nDetailed format information:")?;
        for (i, f) in formats.iter().enumerate() {
            writeln!(self.output, "\n{}. {} - ID: {}", i + 1, f.quality, f.format_id)?;
            writeln!(self.output, "   Resolution: {}x{}", f.width, f.height)?;
            writeln!(self.output, "   Format: {}", f.ext)?;
            writeln!(self.output, "   Size: {}", f.size)?;
            writeln!(self.output, "   FPS: {}", f.fps_label())?;
            if !f.note.is_empty() {
                writeln!(self.output, "   Note: {}", f.note)?;
            }
        }
        Ok(())
    }

    /// Print the prompt and read one line. End of input is [`Error::InputClosed`].
    fn ask(&mut self, prompt: &str) -> Result<String> {
        ask(&mut self.input, &mut self.output, prompt)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::{RawFormat, VideoLink};

    struct Probe {
        title: Option<&'static str>,
        calls: Cell<usize>,
    }

    impl Probe {
        fn new(title: Option<&'static str>) -> Self {
            Self {
                title,
                calls: Cell::new(0),
            }
        }
    }

    impl TitleProbe for Probe {
        fn probe_title(&self, _link: &VideoLink) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            self.title.map(str::to_owned)
        }
    }

    fn catalog(heights: &[u32]) -> FormatCatalog {
        let raw: Vec<RawFormat> = heights
            .iter()
            .map(|h| RawFormat {
                format_id: format!("fmt-{h}"),
                ext: "mp4".to_owned(),
                height: Some(*h),
                width: Some(h * 16 / 9),
                vcodec: Some("avc1".to_owned()),
                format_note: Some(format!("note {h}")),
                ..Default::default()
            })
            .collect();
        FormatCatalog::new(
            "A title",
            VideoLink::new("https://www.aparat.com/v/x".to_owned()),
            &raw,
        )
    }

    fn run(catalog: &FormatCatalog, input: &str, probe: &Probe) -> (Selection, String) {
        let mut output = Vec::new();
        let selection = Selector::new(input.as_bytes(), &mut output)
            .select(catalog, 1, 3, probe)
            .unwrap();
        (selection, String::from_utf8(output).unwrap())
    }

    fn selected_id(selection: &Selection) -> Option<&str> {
        match selection {
            Selection::Selected(f) => Some(f.format_id.as_str()),
            _ => None,
        }
    }

    #[test]
    fn number_selects_that_format() {
        let (selection, _) = run(&catalog(&[1080, 720, 480]), "2\n", &Probe::new(None));
        assert_eq!(selected_id(&selection), Some("fmt-720"));
    }

    #[test]
    fn best_is_the_first_format() {
        let (selection, _) = run(&catalog(&[480, 1080, 720]), "B\n", &Probe::new(None));
        assert_eq!(selected_id(&selection), Some("fmt-1080"));
    }

    #[test]
    fn skip_and_quit() {
        let probe = Probe::new(None);
        assert_eq!(run(&catalog(&[720]), "s\n", &probe).0, Selection::Skipped);
        assert_eq!(run(&catalog(&[720]), "q\n", &probe).0, Selection::Exited);
    }

    #[test]
    fn bad_input_asks_again() {
        let (selection, output) = run(
            &catalog(&[1080, 720, 480]),
            "0\n4\n-1\nfoo\n\nt\n3\n",
            &Probe::new(None),
        );

        assert_eq!(selected_id(&selection), Some("fmt-480"));
        assert_eq!(output.matches("Please enter a number between 1 and 3").count(), 3);
        assert_eq!(output.matches("Invalid input").count(), 3);
        assert_eq!(output.matches("Select format (1-3").count(), 7);
    }

    #[test]
    fn info_prints_details_and_stays() {
        let (selection, output) = run(&catalog(&[1080, 720]), "i\n1\n", &Probe::new(None));

        assert_eq!(selected_id(&selection), Some("fmt-1080"));
        assert!(output.contains("Detailed format information"));
        assert!(output.contains("Resolution: 1280x720"));
        assert!(output.contains("Note: note 720"));
    }

    #[test]
    fn table_lists_every_format() {
        let (_, output) = run(&catalog(&[1080, 144]), "s\n", &Probe::new(None));

        assert!(output.contains("Available formats (2 options)"));
        assert!(output.contains("1920x1080"));
        assert!(output.contains("fmt-144"));
        assert!(output.contains("Unknown"));
    }

    #[test]
    fn closed_input_exits() {
        let (selection, _) = run(&catalog(&[720]), "", &Probe::new(None));
        assert_eq!(selection, Selection::Exited);

        let (selection, _) = run(&catalog(&[]), "x\n", &Probe::new(None));
        assert_eq!(selection, Selection::Exited);
    }

    #[test]
    fn empty_catalog_offers_skip_alternative_quit() {
        let empty = catalog(&[]);

        let probe = Probe::new(Some("Page heading"));
        let (selection, output) = run(&empty, "2\nt\n", &probe);
        assert_eq!(selection, Selection::Skipped);
        assert_eq!(probe.calls.get(), 1);
        assert!(output.contains("No video formats found!"));
        assert!(output.contains("Please enter one of the letters (s,t,q)"));
        assert!(output.contains("Page title: Page heading"));

        let probe = Probe::new(None);
        assert_eq!(run(&empty, "s\n", &probe).0, Selection::Skipped);
        assert_eq!(run(&empty, "q\n", &probe).0, Selection::Exited);
        assert_eq!(probe.calls.get(), 0);
    }

    #[test]
    fn choices_are_parsed() {
        assert_eq!(parse_choice(" 3 ", 3), Choice::Index(2));
        assert_eq!(parse_choice("Q", 3), Choice::Quit);
        assert_eq!(parse_choice("99999999999999999999", 3), Choice::Invalid);
        assert_eq!(parse_choice("1", 0), Choice::OutOfRange);
    }
}
