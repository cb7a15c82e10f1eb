/// Declares an accessor for a placeholder compiled into the program.
///
/// The bytes live in a `#[used]` static placed in `.rodata.embsign` on ELF
/// targets and `__TEXT,__embsign` on Apple targets. Calling the accessor keeps
/// the static referenced, so a signed build can later locate and replace it.
///
/// ```
/// embsign::placeholder_section!(pub signature_slot);
///
/// assert_eq!(signature_slot(), embsign::config::DEFAULT_PLACEHOLDER.as_bytes());
/// ```
#[macro_export]
macro_rules! placeholder_section {
    ($(#[$meta:meta])* $vis:vis $accessor:ident) => {
        $(#[$meta])*
        $vis fn $accessor() -> &'static [u8] {
            #[used]
            #[cfg_attr(target_vendor = "apple", link_section = "__TEXT,__embsign")]
            #[cfg_attr(
                any(
                    target_os = "linux",
                    target_os = "android",
                    target_os = "freebsd",
                    target_os = "netbsd",
                    target_os = "openbsd",
                    target_os = "dragonfly",
                    target_os = "illumos",
                    target_os = "solaris"
                ),
                link_section = ".rodata.embsign"
            )]
            static PLACEHOLDER: [u8; $crate::config::DEFAULT_PLACEHOLDER.len()] =
                $crate::config::DEFAULT_PLACEHOLDER_BYTES;

            ::std::hint::black_box(&PLACEHOLDER[..])
        }
    };
}
