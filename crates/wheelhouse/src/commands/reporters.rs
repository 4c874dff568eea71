use std::fmt::Write;

use indicatif::{ProgressBar, ProgressStyle};

use wheelhouse_resolver::Download;

use crate::printer::Printer;

#[derive(Debug)]
pub(crate) struct DownloadReporter {
    printer: Printer,
    progress: ProgressBar,
}

impl From<Printer> for DownloadReporter {
    fn from(printer: Printer) -> Self {
        let progress = ProgressBar::with_draw_target(None, printer.target());
        progress.set_message("Collecting distributions...");
        progress.set_style(
            ProgressStyle::with_template("{spinner:.dim} [{pos}] {wide_msg:.dim}").unwrap(),
        );
        Self { printer, progress }
    }
}

impl wheelhouse_resolver::Reporter for DownloadReporter {
    fn on_download(&self, download: &Download) {
        self.progress.set_message(download.to_string());
        self.progress.inc(1);

        let message = if download.already_downloaded {
            format!("File was already downloaded {}", download.path.display())
        } else {
            format!("Saved {}", download.path.display())
        };
        let mut printer = self.printer;
        self.progress.suspend(|| {
            // Writing to the printer can't fail.
            let _ = writeln!(printer, "{message}");
        });
    }

    fn on_complete(&self) {
        self.progress.finish_and_clear();
    }
}
