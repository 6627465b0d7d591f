//! 实验结果.

use crate::algos::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Decoded entries: {}", p.get_entries())?;
    writeln!(w, "{S4}Skipped entries: {}", p.get_skipped())?;
    writeln!(w, "{S4}Non-finite landmarks: {}", p.get_non_finite())?;
    writeln!(w, "{S4}Decode total time: {} us", p.get_decode_time_us())?;
    writeln!(
        w,
        "{S4}Decode average time: {} us",
        f64_to_display(p.get_avg_decode_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    writeln!(w, "{S4}Mean Cobb angle: {} deg", f64_to_display(p.get_avg_cobb()))?;
    writeln!(w, "{S4}Max Cobb angle: {} deg", f64_to_display(p.get_max_cobb()))?;
    writeln!(
        w,
        "{S4}Mean drift from serial soft-argmax: {} px",
        f64_to_display(p.get_avg_drift())
    )?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as f64);
    write!(w, "{S4}Most time-consuming entry costs {} us", f64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        utils::sep_to(&mut out)?;
        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut out)?;
            writeln!(out)?;
            utils::sep_to(&mut out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_empty() {
        let mut buf = Vec::new();
        describe_into("hard", &Profile::new().finish(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Profile `hard`:"));
        assert!(text.contains("Decoded entries: 0"));
        assert!(text.contains("Mean Cobb angle: / deg"));
    }
}
