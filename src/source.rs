//! Recognising C-family source files among argv tokens.

/// Whether `argument` names a C, C++, Objective-C or Objective-C++ source
/// or header, judged purely by the extension after the token's final `.`.
///
/// This is a syntactic test over the whole argv token, not a filesystem
/// check; header extensions count on purpose. Extension list per
/// github/linguist.
pub fn is_source_file(argument: &str) -> bool {
    let Some((_, extension)) = argument.rsplit_once('.') else {
        return false;
    };

    matches!(
        extension,
        "c" | "cats"
            | "h"
            | "idc"
            | "cpp"
            | "c++"
            | "cc"
            | "cp"
            | "cppm"
            | "cxx"
            | "h++"
            | "hh"
            | "hpp"
            | "hxx"
            | "inc"
            | "inl"
            | "ino"
            | "ipp"
            | "ixx"
            | "re"
            | "tcc"
            | "tpp"
            | "m"
            | "mm"
    )
}
