mod registry_macro;
