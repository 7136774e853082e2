//! Flash descriptor region checks

use crate::cli::MecheckArgs;
use rtectl_core::layout::{
    ifd, region_index, required_regions, Finding, FlashImage, RegionChecker, REGION_NAMES,
};
use rtectl_core::Error;
use std::io::{self, Write};
use std::path::Path;

/// Region checker that prints its findings
pub struct Mecheck<'a, W: Write> {
    image: &'a FlashImage,
    checker: RegionChecker<'a>,
    out: W,
    verbose: bool,
}

impl<'a, W: Write> Mecheck<'a, W> {
    /// Start checking `image`, printing descriptor registers when verbose
    pub fn new(image: &'a FlashImage, out: W, verbose: bool) -> io::Result<Self> {
        let mut this = Self {
            image,
            checker: RegionChecker::new(image),
            out,
            verbose,
        };
        if verbose {
            let desc = image.descriptor();
            writeln!(this.out, "FLVALSIG: {:#010x}", ifd::FLVALSIG)?;
            writeln!(this.out, "FLMAP0: {:#010x}", desc.flmap0)?;
            writeln!(this.out, "FRBA: {:#06x}", desc.frba)?;
        }
        Ok(this)
    }

    fn print_registers(&mut self, name: &str, index: usize) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        if let (Ok(flreg), Ok(bounds)) = (self.image.flreg(index), self.image.region_bounds(index))
        {
            writeln!(self.out, "{}_FLREG: {:#010x}", name, flreg)?;
            writeln!(self.out, "{}_BASE: {:#010x}", name, bounds.base)?;
            writeln!(self.out, "{}_LIMIT: {:#010x}", name, bounds.limit)?;
        }
        Ok(())
    }

    fn print_error(&mut self, err: &Error) -> io::Result<()> {
        match err {
            Error::UnknownRegion(name) => {
                writeln!(self.out, "FAILURE: Unknown flash region: \"{}\"", name)
            }
            Error::RegionEmpty { name, index } => writeln!(
                self.out,
                "FAILURE: Region \"{}\" at index {} is empty!",
                name, index
            ),
            other => writeln!(self.out, "FAILURE: {}", other),
        }
    }

    /// Check that a region is present and holds data
    pub fn check(&mut self, name: &str) -> io::Result<()> {
        let report = match self.checker.check(name) {
            Ok(report) => report,
            Err(e) => {
                self.print_error(&e)?;
                if self.verbose && !matches!(e, Error::UnknownRegion(_)) {
                    writeln!(self.out, "FAILURE: region data access failed.")?;
                }
                return Ok(());
            }
        };

        match report.finding {
            Finding::Empty => {
                writeln!(
                    self.out,
                    "FAILURE: Region \"{}\" at index {} is empty!",
                    name, report.index
                )?;
                if self.verbose {
                    writeln!(self.out, "FAILURE: region data access failed.")?;
                }
            }
            Finding::Filled(value) => {
                self.print_registers(name, report.index)?;
                writeln!(
                    self.out,
                    "FAILURE: Invalid region content, filled with: {:#04x}",
                    value
                )?;
                writeln!(
                    self.out,
                    "SUCCESS: region \"{}\" is present and contains some data.",
                    name
                )?;
            }
            Finding::Data => {
                self.print_registers(name, report.index)?;
                writeln!(
                    self.out,
                    "SUCCESS: region \"{}\" is present and contains some data.",
                    name
                )?;
            }
        }
        Ok(())
    }

    /// Dump a region to `<name>_dump.bin` in `dir`
    pub fn dump(&mut self, name: &str, dir: &Path) -> io::Result<()> {
        if let Ok(index) = region_index(name) {
            self.print_registers(name, index)?;
        }
        match self.checker.dump(name, dir) {
            Ok(_) => writeln!(
                self.out,
                "Region \"{}\" dumped to: {}_dump.bin",
                name, name
            ),
            Err(e) => {
                self.print_error(&e)?;
                if self.verbose && !matches!(e, Error::UnknownRegion(_)) {
                    writeln!(self.out, "Region dump failed.")?;
                }
                Ok(())
            }
        }
    }

    /// Whether any check or dump failed
    pub fn failed(&self) -> bool {
        self.checker.failed()
    }

    /// Exit status, forced to 0 in dry mode
    pub fn exit_code(&mut self, dry: bool) -> io::Result<i32> {
        if dry && self.verbose {
            writeln!(self.out, "WARNING: this is dry run with exit status overridden.")?;
        }
        Ok(self.checker.exit_code(dry))
    }
}

/// Load an image, printing the same diagnostic as mecheck when it has no descriptor
pub fn load_image(
    path: &Path,
    out: &mut impl Write,
) -> Result<Option<FlashImage>, Box<dyn std::error::Error>> {
    match FlashImage::from_file(path) {
        Ok(image) => Ok(Some(image)),
        Err(Error::InvalidDescriptor) => {
            writeln!(out, "Invalid image, no FLVALSIG found!")?;
            Ok(None)
        }
        Err(e) => Err(format!("Failed to read {}: {}", path.display(), e).into()),
    }
}

/// Check the regions a flash write relies on, printing every diagnostic
///
/// Returns whether the image passed.
pub fn check_for_write<W: Write>(
    path: &Path,
    bios_only: bool,
    mut out: W,
) -> Result<bool, Box<dyn std::error::Error>> {
    let Some(image) = load_image(path, &mut out)? else {
        return Ok(false);
    };
    let mut mecheck = Mecheck::new(&image, out, false)?;
    for name in required_regions(bios_only) {
        mecheck.check(name)?;
    }
    Ok(!mecheck.failed())
}

/// Decide whether `path` may be written to flash
///
/// An image failing [`check_for_write`] is only written with `force`.
pub fn allow_write<W: Write>(
    path: &Path,
    bios_only: bool,
    force: bool,
    out: W,
) -> Result<bool, Box<dyn std::error::Error>> {
    if check_for_write(path, bios_only, out)? {
        return Ok(true);
    }
    if force {
        log::warn!("{} failed the region checks, writing anyway", path.display());
    }
    Ok(force)
}

/// Run the `mecheck` command and return its exit status
pub fn run(args: &MecheckArgs, verbose: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();

    if verbose {
        writeln!(stdout, "Verbosity increased.")?;
    }

    if args.list {
        writeln!(stdout, "Known regions:")?;
        for name in REGION_NAMES {
            writeln!(stdout, "{}", name)?;
        }
        return Ok(0);
    }

    let Some(path) = args.image.as_deref() else {
        writeln!(stdout, "FATAL: flash image file name not provided.")?;
        return Ok(1);
    };

    let Some(image) = load_image(path, &mut stdout)? else {
        return Ok(1);
    };

    let mut mecheck = Mecheck::new(&image, stdout, verbose)?;
    for name in &args.check {
        mecheck.check(name)?;
    }
    for name in &args.dump {
        mecheck.dump(name, Path::new("."))?;
    }
    Ok(mecheck.exit_code(args.dry_run)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rtectl_core::layout::ifd::FLVALSIG;

    /// Descriptor at 0, FRBA 0x40, bios 0x1000-0x1fff with data, me 0x2000-0x2fff erased
    fn image() -> FlashImage {
        let mut data = vec![0xFF; 0x3000];
        data[0..4].copy_from_slice(&FLVALSIG.to_le_bytes());
        data[4..8].copy_from_slice(&(0x04u32 << 16).to_le_bytes());
        let mut regions = [0x7FFFu32; 16];
        regions[0] = 0x0000_0000;
        regions[1] = 0x0001_0001;
        regions[2] = 0x0002_0002;
        for (i, word) in regions.iter().enumerate() {
            data[0x40 + i * 4..0x44 + i * 4].copy_from_slice(&word.to_le_bytes());
        }
        for (i, byte) in data[0x1000..0x2000].iter_mut().enumerate() {
            *byte = i as u8;
        }
        FlashImage::load(data).unwrap()
    }

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_check_messages() {
        let image = image();
        let mut out = Vec::new();
        let mut mecheck = Mecheck::new(&image, &mut out, false).unwrap();
        mecheck.check("bios").unwrap();
        assert!(!mecheck.failed());
        mecheck.check("me").unwrap();
        mecheck.check("gbe").unwrap();
        mecheck.check("nvram").unwrap();
        assert!(mecheck.failed());
        assert_eq!(mecheck.exit_code(false).unwrap(), 1);
        drop(mecheck);

        assert_eq!(
            output(out),
            "SUCCESS: region \"bios\" is present and contains some data.\n\
             FAILURE: Invalid region content, filled with: 0xff\n\
             SUCCESS: region \"me\" is present and contains some data.\n\
             FAILURE: Region \"gbe\" at index 3 is empty!\n\
             FAILURE: Unknown flash region: \"nvram\"\n"
        );
    }

    #[test]
    fn test_verbose_registers() {
        let image = image();
        let mut out = Vec::new();
        let mut mecheck = Mecheck::new(&image, &mut out, true).unwrap();
        mecheck.check("bios").unwrap();
        mecheck.check("gbe").unwrap();
        assert_eq!(mecheck.exit_code(true).unwrap(), 0);
        drop(mecheck);

        assert_eq!(
            output(out),
            "FLVALSIG: 0x0ff0a55a\n\
             FLMAP0: 0x00040000\n\
             FRBA: 0x0040\n\
             bios_FLREG: 0x00010001\n\
             bios_BASE: 0x00001000\n\
             bios_LIMIT: 0x00001fff\n\
             SUCCESS: region \"bios\" is present and contains some data.\n\
             FAILURE: Region \"gbe\" at index 3 is empty!\n\
             FAILURE: region data access failed.\n\
             WARNING: this is dry run with exit status overridden.\n"
        );
    }

    #[test]
    fn test_dump_writes_region() {
        let dir = tempfile::tempdir().unwrap();
        let image = image();
        let mut out = Vec::new();
        let mut mecheck = Mecheck::new(&image, &mut out, false).unwrap();
        mecheck.dump("bios", dir.path()).unwrap();
        mecheck.dump("gbe", dir.path()).unwrap();
        assert!(mecheck.failed());
        drop(mecheck);

        let dumped = std::fs::read(dir.path().join("bios_dump.bin")).unwrap();
        assert_eq!(dumped, &image.data()[0x1000..0x2000]);
        assert_eq!(
            output(out),
            "Region \"bios\" dumped to: bios_dump.bin\n\
             FAILURE: Region \"gbe\" at index 3 is empty!\n"
        );
    }

    #[test]
    fn test_write_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreboot.rom");
        std::fs::write(&path, image().data()).unwrap();

        let mut out = Vec::new();
        assert!(check_for_write(&path, true, &mut out).unwrap());
        // The ME region of the image is erased
        assert!(!check_for_write(&path, false, &mut out).unwrap());
    }

    #[test]
    fn test_allow_write_needs_force_for_failing_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreboot.rom");
        std::fs::write(&path, image().data()).unwrap();

        assert!(allow_write(&path, true, false, io::sink()).unwrap());
        assert!(!allow_write(&path, false, false, io::sink()).unwrap());
        assert!(allow_write(&path, false, true, io::sink()).unwrap());
    }

    #[test]
    fn test_write_gate_rejects_zero_length_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreboot.rom");
        let mut data = image().data().to_vec();
        // me: base 0x2000 past limit 0x1fff
        data[0x48..0x4C].copy_from_slice(&0x0001_0002u32.to_le_bytes());
        std::fs::write(&path, data).unwrap();

        let mut out = Vec::new();
        assert!(!allow_write(&path, false, false, &mut out).unwrap());
        assert!(output(out).contains("FAILURE: Region \"me\" at index 2 is empty!"));
    }

    #[test]
    fn test_image_without_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.rom");
        std::fs::write(&path, vec![0xFF; 0x1000]).unwrap();

        let mut out = Vec::new();
        assert!(load_image(&path, &mut out).unwrap().is_none());
        assert_eq!(output(out), "Invalid image, no FLVALSIG found!\n");
    }
}
